//! Timed destruction

use crate::activation::{Activatable, Activation};
use parts_core::{EntityId, Scheduler, TimerKey};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Timer purpose for lifetimes
pub const LIFETIME: &str = "lifetime";

/// What happens when the lifetime runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifetimeAction {
    Destroy,
    Deactivate,
}

impl Default for LifetimeAction {
    fn default() -> Self {
        Self::Destroy
    }
}

/// Removes its entity after a random time in `[min, max]` seconds. The clock
/// restarts on every activation and stops on deactivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lifetime {
    id: EntityId,
    min: f32,
    max: f32,
    pub action: LifetimeAction,
    activation: Activatable,
}

impl Lifetime {
    pub fn new(id: EntityId, seconds: f32) -> Self {
        Self {
            id,
            min: seconds,
            max: seconds,
            action: LifetimeAction::default(),
            activation: Activatable::default(),
        }
    }

    /// Random lifetime; `max` below `min` is raised to `min`
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min.max(0.0);
        self.max = max.max(self.min);
        self
    }

    pub fn with_action(mut self, action: LifetimeAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_activation(mut self, activation: Activatable) -> Self {
        self.activation = activation;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    fn key(&self) -> TimerKey {
        TimerKey::new(self.id, LIFETIME)
    }

    /// Activate if configured to start active
    pub fn start(&mut self, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        if self.activation.starts_active() {
            self.activate(scheduler, rng);
        }
    }

    /// (Re)start the clock with a fresh random duration
    pub fn activate(&mut self, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        self.activation.activate();
        let seconds = if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        };
        scheduler.start_once(self.key(), seconds);
    }

    pub fn deactivate(&mut self, scheduler: &mut Scheduler) {
        self.activation.deactivate();
        scheduler.cancel(self.key());
    }

    pub fn apply(&mut self, signal: Activation, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        match signal {
            Activation::Activate => self.activate(scheduler, rng),
            Activation::Deactivate => self.deactivate(scheduler),
        }
    }

    /// If `key` is this lifetime's timer, return what to do with the entity
    pub fn handle_timer(&mut self, key: &TimerKey) -> Option<LifetimeAction> {
        if !key.is(self.id, LIFETIME) {
            return None;
        }
        log::debug!("lifetime of {} expired: {:?}", self.id, self.action);
        if self.action == LifetimeAction::Deactivate {
            self.activation.deactivate();
        }
        Some(self.action)
    }
}
