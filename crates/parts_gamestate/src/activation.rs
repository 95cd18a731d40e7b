//! On/off switch shared by spawners, lifetimes and other timed components

use serde::{Deserialize, Serialize};

/// Signal sent to an activatable component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Activate,
    Deactivate,
}

/// Tracks whether a component is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activatable {
    /// Activate when the component starts
    pub activate_on_awake: bool,
    active: bool,
}

impl Default for Activatable {
    fn default() -> Self {
        Self {
            activate_on_awake: true,
            active: false,
        }
    }
}

impl Activatable {
    pub fn new(activate_on_awake: bool) -> Self {
        Self {
            activate_on_awake,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether starting the component should activate it
    pub fn starts_active(&self) -> bool {
        self.activate_on_awake
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn apply(&mut self, signal: Activation) {
        match signal {
            Activation::Activate => self.activate(),
            Activation::Deactivate => self.deactivate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activatable() {
        let mut a = Activatable::default();
        assert!(a.starts_active());
        assert!(!a.is_active());
        a.apply(Activation::Activate);
        assert!(a.is_active());
        a.apply(Activation::Deactivate);
        assert!(!a.is_active());
        assert!(!Activatable::new(false).starts_active());
    }
}
