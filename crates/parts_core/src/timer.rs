//! Timer scheduler
//!
//! Every delayed behaviour in the toolkit (weapon cooldowns, auto-fire pulses,
//! sensor polling, damage-over-time ticks, lifetimes, respawns) is a timer
//! keyed by the entity that owns it and a purpose string. Starting a key that
//! is already pending replaces it: the old entry is dropped and never fires.
//!
//! The scheduler does not call back into gameplay code. [`Scheduler::tick`]
//! returns the keys that came due and the owners react to them.

use crate::id::EntityId;
use std::collections::HashMap;

/// Identifies one logical timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    /// Entity the timer belongs to
    pub owner: EntityId,
    /// What the timer is for ("cooldown", "sense", "dot", ...)
    pub purpose: &'static str,
    /// Optional second entity, used to run one loop per (source, target) pair
    pub target: Option<EntityId>,
}

impl TimerKey {
    /// Create a key for an owner and purpose
    pub const fn new(owner: EntityId, purpose: &'static str) -> Self {
        Self {
            owner,
            purpose,
            target: None,
        }
    }

    /// Key the timer on a target as well
    pub const fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Check owner and purpose, ignoring the target
    #[inline]
    pub fn is(&self, owner: EntityId, purpose: &str) -> bool {
        self.owner == owner && self.purpose == purpose
    }
}

#[derive(Debug, Clone)]
struct TimerEntry {
    remaining: f32,
    interval: Option<f32>,
    generation: u64,
}

/// Single-threaded timer wheel driven by the update loop
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<TimerKey, TimerEntry>,
    next_generation: u64,
    elapsed: f64,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a one-shot timer, replacing any pending timer with the same key.
    /// Returns the generation of the new entry.
    pub fn start_once(&mut self, key: TimerKey, delay: f32) -> u64 {
        self.insert(key, delay.max(0.0), None)
    }

    /// Start a repeating timer. The first pulse comes after `first_delay`,
    /// later pulses every `interval` seconds. A zero interval pulses every tick.
    pub fn start_repeating(&mut self, key: TimerKey, interval: f32, first_delay: f32) -> u64 {
        self.insert(key, first_delay.max(0.0), Some(interval.max(0.0)))
    }

    fn insert(&mut self, key: TimerKey, delay: f32, interval: Option<f32>) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = TimerEntry {
            remaining: delay,
            interval,
            generation,
        };
        if self.timers.insert(key, entry).is_some() {
            log::trace!("timer {:?} replaced", key);
        }
        generation
    }

    /// Cancel a pending timer. Returns true if one was pending.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.timers.remove(&key).is_some()
    }

    /// Cancel every timer owned by an entity. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|key, _| key.owner != owner);
        before - self.timers.len()
    }

    /// Cancel every timer of an owner with the given purpose, whatever its target
    pub fn cancel_purpose(&mut self, owner: EntityId, purpose: &str) -> usize {
        let before = self.timers.len();
        self.timers.retain(|key, _| !key.is(owner, purpose));
        before - self.timers.len()
    }

    /// Check if a timer is pending
    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.timers.contains_key(&key)
    }

    /// Time until a pending timer fires
    pub fn remaining(&self, key: TimerKey) -> Option<f32> {
        self.timers.get(&key).map(|t| t.remaining.max(0.0))
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Total time advanced through `tick`
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance all timers and return the keys that came due, earliest first.
    /// Repeating timers fire at most once per tick.
    pub fn tick(&mut self, dt: f32) -> Vec<TimerKey> {
        self.elapsed += dt as f64;

        let mut due: Vec<(f32, u64, TimerKey)> = Vec::new();
        for (key, entry) in self.timers.iter_mut() {
            entry.remaining -= dt;
            if entry.remaining <= 0.0 {
                due.push((entry.remaining, entry.generation, *key));
            }
        }

        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, _, key) in &due {
            let repeat = self.timers.get(key).and_then(|e| e.interval);
            match repeat {
                Some(interval) => {
                    if let Some(entry) = self.timers.get_mut(key) {
                        entry.remaining = (entry.remaining + interval).max(0.0);
                    }
                }
                None => {
                    self.timers.remove(key);
                }
            }
        }

        due.into_iter().map(|(_, _, key)| key).collect()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut s = Scheduler::new();
        let key = TimerKey::new(owner(1), "cooldown");
        s.start_once(key, 0.5);

        assert!(s.tick(0.3).is_empty());
        assert_eq!(s.tick(0.3), vec![key]);
        assert!(s.tick(1.0).is_empty());
        assert!(!s.is_pending(key));
    }

    #[test]
    fn test_replace_cancels_previous() {
        let mut s = Scheduler::new();
        let key = TimerKey::new(owner(1), "lifetime");
        s.start_once(key, 0.2);
        s.tick(0.1);
        // Restart pushes the deadline out; the first deadline must not fire
        s.start_once(key, 0.5);
        assert!(s.tick(0.15).is_empty());
        assert_eq!(s.len(), 1);
        assert_eq!(s.tick(0.4), vec![key]);
    }

    #[test]
    fn test_repeating_at_most_once_per_tick() {
        let mut s = Scheduler::new();
        let key = TimerKey::new(owner(2), "auto_fire");
        s.start_repeating(key, 0.1, 0.1);

        // A long frame still yields a single pulse
        assert_eq!(s.tick(0.35), vec![key]);
        assert!(s.is_pending(key));
        assert_eq!(s.tick(0.01), vec![key]);
    }

    #[test]
    fn test_zero_interval_pulses_every_tick() {
        let mut s = Scheduler::new();
        let key = TimerKey::new(owner(3), "sense");
        s.start_repeating(key, 0.0, 0.0);
        for _ in 0..5 {
            assert_eq!(s.tick(0.016), vec![key]);
        }
    }

    #[test]
    fn test_target_keys_are_distinct() {
        let mut s = Scheduler::new();
        let a = TimerKey::new(owner(1), "dot").with_target(owner(10));
        let b = TimerKey::new(owner(1), "dot").with_target(owner(11));
        s.start_repeating(a, 0.5, 0.5);
        s.start_repeating(b, 0.5, 0.5);
        // Same pair again replaces instead of stacking
        s.start_repeating(a, 0.5, 0.5);
        assert_eq!(s.len(), 2);

        assert_eq!(s.cancel_purpose(owner(1), "dot"), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn test_due_order() {
        let mut s = Scheduler::new();
        let late = TimerKey::new(owner(1), "late");
        let early = TimerKey::new(owner(2), "early");
        s.start_once(late, 0.3);
        s.start_once(early, 0.1);
        assert_eq!(s.tick(0.5), vec![early, late]);
    }

    #[test]
    fn test_cancel_owner() {
        let mut s = Scheduler::new();
        s.start_once(TimerKey::new(owner(1), "a"), 1.0);
        s.start_once(TimerKey::new(owner(1), "b"), 1.0);
        s.start_once(TimerKey::new(owner(2), "a"), 1.0);
        assert_eq!(s.cancel_owner(owner(1)), 2);
        assert_eq!(s.len(), 1);
        assert!(s.cancel(TimerKey::new(owner(2), "a")));
        assert!(!s.cancel(TimerKey::new(owner(2), "a")));
    }

    #[test]
    fn test_remaining() {
        let mut s = Scheduler::new();
        let key = TimerKey::new(owner(1), "respawn");
        s.start_once(key, 2.0);
        s.tick(0.5);
        approx::assert_relative_eq!(s.remaining(key).unwrap_or(0.0), 1.5);
    }
}
