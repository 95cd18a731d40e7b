//! Ordered level sequence

use serde::{Deserialize, Serialize};

/// What a scene is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneKind {
    /// Main menu, options and similar
    Menu,
    /// Gameplay; the player is spawned when it becomes ready
    Level,
    /// Non-interactive cutscene
    Cinematic,
}

impl Default for SceneKind {
    fn default() -> Self {
        Self::Level
    }
}

/// A loadable scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub name: String,
    pub kind: SceneKind,
    /// Music cue played while the scene is active
    pub music: Option<String>,
}

impl SceneDescriptor {
    pub fn new(name: impl Into<String>, kind: SceneKind) -> Self {
        Self {
            name: name.into(),
            kind,
            music: None,
        }
    }

    pub fn level(name: impl Into<String>) -> Self {
        Self::new(name, SceneKind::Level)
    }

    pub fn menu(name: impl Into<String>) -> Self {
        Self::new(name, SceneKind::Menu)
    }

    pub fn with_music(mut self, cue: impl Into<String>) -> Self {
        self.music = Some(cue.into());
        self
    }
}

/// The levels in play order and which one is current
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneProgression {
    levels: Vec<SceneDescriptor>,
    current_index: usize,
}

impl SceneProgression {
    pub fn new(levels: Vec<SceneDescriptor>) -> Self {
        if levels.is_empty() {
            log::warn!("scene progression has no levels");
        }
        Self {
            levels,
            current_index: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// One-based number for display ("Level 2 of 5")
    pub fn current_level_number(&self) -> usize {
        self.current_index + 1
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[SceneDescriptor] {
        &self.levels
    }

    pub fn current_level(&self) -> Option<&SceneDescriptor> {
        self.levels.get(self.current_index)
    }

    pub fn has_next_level(&self) -> bool {
        self.current_index + 1 < self.levels.len()
    }

    pub fn is_first_level(&self) -> bool {
        self.current_index == 0
    }

    /// Advance and return the new current level, or `None` at the end
    pub fn move_to_next_level(&mut self) -> Option<&SceneDescriptor> {
        if !self.has_next_level() {
            log::warn!("no next level, already at the end of the progression");
            return None;
        }
        self.current_index += 1;
        self.current_level()
    }

    /// The level after the current one, without advancing
    pub fn peek_next_level(&self) -> Option<&SceneDescriptor> {
        if !self.has_next_level() {
            return None;
        }
        self.levels.get(self.current_index + 1)
    }

    pub fn get_level(&self, index: usize) -> Option<&SceneDescriptor> {
        let level = self.levels.get(index);
        if level.is_none() {
            log::warn!("level index {} is out of range", index);
        }
        level
    }

    /// Jump to a level. Out-of-range indices are refused.
    pub fn set_level(&mut self, index: usize) -> bool {
        if index >= self.levels.len() {
            log::warn!("cannot set level, index {} is out of range", index);
            return false;
        }
        self.current_index = index;
        true
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Point the index at the level named `active_scene`; unknown names fall
    /// back to the first level
    pub fn resolve_current_scene(&mut self, active_scene: &str) {
        if self.levels.is_empty() {
            return;
        }
        match self.levels.iter().position(|l| l.name == active_scene) {
            Some(index) => self.current_index = index,
            None => {
                log::warn!("active scene '{}' not found in levels, defaulting to index 0", active_scene);
                self.current_index = 0;
            }
        }
    }
}
