//! Playback configuration

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which volume group a sound goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioKind {
    Sfx,
    Music,
}

impl Default for AudioKind {
    fn default() -> Self {
        Self::Sfx
    }
}

/// Culling priority; lower values are culled last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Standard,
    Low,
    VeryLow,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Standard
    }
}

impl Priority {
    pub fn value(self) -> u16 {
        match self {
            Self::Highest => 0,
            Self::High => 64,
            Self::Standard => 128,
            Self::Low => 194,
            Self::VeryLow => 256,
        }
    }
}

/// Reusable settings for how a sound is played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfiguration {
    pub kind: AudioKind,
    pub priority: Priority,
    /// Base volume in `0..=1`
    pub volume: f32,
    /// Random ± variation added to the volume
    pub volume_random: f32,
    /// Playback speed, 1 is normal
    pub pitch: f32,
    /// Random ± variation added to the pitch
    pub pitch_random: f32,
    /// 0 is 2D, 1 is fully positional
    pub spatial_blend: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for AudioConfiguration {
    fn default() -> Self {
        Self {
            kind: AudioKind::Sfx,
            priority: Priority::Standard,
            volume: 1.0,
            volume_random: 0.0,
            pitch: 1.0,
            pitch_random: 0.0,
            spatial_blend: 1.0,
            min_distance: 0.1,
            max_distance: 50.0,
        }
    }
}

impl AudioConfiguration {
    /// Non-positional music defaults
    pub fn music() -> Self {
        Self {
            kind: AudioKind::Music,
            priority: Priority::Highest,
            spatial_blend: 0.0,
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_volume(mut self, volume: f32, random: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self.volume_random = random.abs();
        self
    }

    pub fn with_pitch(mut self, pitch: f32, random: f32) -> Self {
        self.pitch = pitch;
        self.pitch_random = random.abs();
        self
    }

    pub fn with_spatial_blend(mut self, blend: f32) -> Self {
        self.spatial_blend = blend.clamp(0.0, 1.0);
        self
    }

    pub fn with_distance(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min.max(0.0);
        self.max_distance = max.max(self.min_distance);
        self
    }

    /// Draw the random variations for one playback
    pub fn resolve(&self, rng: &mut impl Rng) -> ResolvedSettings {
        ResolvedSettings {
            kind: self.kind,
            priority: self.priority,
            volume: (self.volume + spread(rng, self.volume_random)).clamp(0.0, 1.0),
            pitch: self.pitch + spread(rng, self.pitch_random),
            spatial_blend: self.spatial_blend,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
        }
    }
}

fn spread(rng: &mut impl Rng, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..amount)
    } else {
        0.0
    }
}

/// Settings of one playback after random variation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSettings {
    pub kind: AudioKind,
    pub priority: Priority,
    pub volume: f32,
    pub pitch: f32,
    pub spatial_blend: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_priority_values() {
        assert_eq!(Priority::Highest.value(), 0);
        assert_eq!(Priority::default().value(), 128);
        assert_eq!(Priority::VeryLow.value(), 256);
        assert!(Priority::High < Priority::Low);
    }

    #[test]
    fn test_resolve_without_variation() {
        let mut rng = StdRng::seed_from_u64(2);
        let settings = AudioConfiguration::default().resolve(&mut rng);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.pitch, 1.0);
        assert_eq!(settings.max_distance, 50.0);
    }

    #[test]
    fn test_resolve_variation_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = AudioConfiguration::default().with_volume(0.5, 0.2).with_pitch(1.0, 0.25);
        for _ in 0..100 {
            let s = config.resolve(&mut rng);
            assert!((0.29..0.71).contains(&s.volume));
            assert!((0.74..1.26).contains(&s.pitch));
        }
    }

    #[test]
    fn test_music_preset() {
        let music = AudioConfiguration::music();
        assert_eq!(music.kind, AudioKind::Music);
        assert_eq!(music.spatial_blend, 0.0);
    }
}
