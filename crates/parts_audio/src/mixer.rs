//! Volume groups

use crate::config::AudioKind;
use parts_event::DataCell;
use parts_gamestate::SharedPrefs;
use serde::{Deserialize, Serialize};

/// Decibel level used for silence
pub const SILENT_DB: f32 = -144.0;

/// Linear volume (`0..=1`) to decibels
pub fn linear_to_db(linear: f32) -> f32 {
    if linear != 0.0 {
        20.0 * linear.log10()
    } else {
        SILENT_DB
    }
}

/// Decibels to linear volume
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// A mixer volume group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixerGroup {
    Master,
    Sfx,
    Music,
}

impl MixerGroup {
    pub const ALL: [MixerGroup; 3] = [Self::Master, Self::Sfx, Self::Music];

    /// Prefs key and mixer parameter name
    pub fn key(self) -> &'static str {
        match self {
            Self::Master => "MasterVolume",
            Self::Sfx => "SFXVolume",
            Self::Music => "MusicVolume",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Master => 0,
            Self::Sfx => 1,
            Self::Music => 2,
        }
    }
}

impl From<AudioKind> for MixerGroup {
    fn from(kind: AudioKind) -> Self {
        match kind {
            AudioKind::Sfx => Self::Sfx,
            AudioKind::Music => Self::Music,
        }
    }
}

/// Group levels in decibels. Linear levels are mirrored into data cells an
/// options screen can edit; [`Mixer::sync`] applies those edits.
#[derive(Debug)]
pub struct Mixer {
    prefs: SharedPrefs,
    db: [f32; 3],
    cells: [DataCell<f32>; 3],
    seen: [u64; 3],
}

impl Mixer {
    /// Load each group's saved level (default 1) from prefs
    pub fn new(prefs: SharedPrefs) -> Self {
        let mut mixer = Self {
            prefs,
            db: [0.0; 3],
            cells: [DataCell::new(1.0), DataCell::new(1.0), DataCell::new(1.0)],
            seen: [0; 3],
        };
        for group in MixerGroup::ALL {
            let linear = mixer.prefs.lock().get_float(group.key(), 1.0);
            mixer.set_group_volume(group, linear);
        }
        mixer
    }

    /// Cell holding a group's linear level
    pub fn volume_cell(&self, group: MixerGroup) -> DataCell<f32> {
        self.cells[group.index()].clone()
    }

    pub fn group_db(&self, group: MixerGroup) -> f32 {
        self.db[group.index()]
    }

    /// Linear level of a group
    pub fn group_volume(&self, group: MixerGroup) -> f32 {
        db_to_linear(self.group_db(group))
    }

    /// Set a group's linear level: stored in dB and remembered in prefs
    pub fn set_group_volume(&mut self, group: MixerGroup, linear: f32) {
        let linear = linear.clamp(0.0, 1.0);
        let i = group.index();
        self.db[i] = linear_to_db(linear);
        self.prefs.lock().set_float(group.key(), linear);

        if self.cells[i].get() != linear {
            self.cells[i].set(linear);
        }
        self.seen[i] = self.cells[i].version();
        log::debug!("{} set to {:.1} dB", group.key(), self.db[i]);
    }

    /// Apply levels written to the volume cells since the last call. Returns
    /// true if anything changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        for group in MixerGroup::ALL {
            let i = group.index();
            if self.cells[i].version() != self.seen[i] {
                let linear = self.cells[i].get();
                self.set_group_volume(group, linear);
                changed = true;
            }
        }
        changed
    }

    /// Master level times the level of the group `kind` plays through
    pub fn output_volume(&self, kind: AudioKind) -> f32 {
        self.group_volume(MixerGroup::Master) * self.group_volume(kind.into())
    }

    /// Persist the levels now
    pub fn save(&self) -> parts_gamestate::prefs::Result<()> {
        self.prefs.lock().save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use parts_gamestate::Prefs;

    #[test]
    fn test_db_conversion() {
        assert_eq!(linear_to_db(0.0), SILENT_DB);
        assert_abs_diff_eq!(linear_to_db(1.0), 0.0);
        assert_abs_diff_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert_abs_diff_eq!(db_to_linear(-6.0206), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(db_to_linear(linear_to_db(0.25)), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_loads_saved_levels() {
        let mut prefs = Prefs::new();
        prefs.set_float("MusicVolume", 0.5);
        let mixer = Mixer::new(prefs.shared());
        assert_abs_diff_eq!(mixer.group_volume(MixerGroup::Master), 1.0);
        assert_abs_diff_eq!(mixer.group_volume(MixerGroup::Music), 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(mixer.output_volume(AudioKind::Music), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_set_persists_linear() {
        let prefs = Prefs::new().shared();
        let mut mixer = Mixer::new(prefs.clone());
        mixer.set_group_volume(MixerGroup::Sfx, 0.0);
        assert_eq!(mixer.group_db(MixerGroup::Sfx), SILENT_DB);
        assert_eq!(prefs.lock().get_float("SFXVolume", 1.0), 0.0);
        assert_eq!(mixer.volume_cell(MixerGroup::Sfx).get(), 0.0);
    }

    #[test]
    fn test_sync_applies_cell_edits() {
        let prefs = Prefs::new().shared();
        let mut mixer = Mixer::new(prefs.clone());
        assert!(!mixer.sync());

        mixer.volume_cell(MixerGroup::Master).set(0.5);
        assert!(mixer.sync());
        assert!(!mixer.sync());
        assert_abs_diff_eq!(mixer.output_volume(AudioKind::Sfx), 0.5, epsilon = 1e-5);
        assert_eq!(prefs.lock().get_float("MasterVolume", 1.0), 0.5);
    }
}
