//! Headless emitters and the emitter pool

use crate::config::{AudioKind, ResolvedSettings};
use crate::cue::AudioClip;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Pool size used when none is given
pub const DEFAULT_MAX_EMITTERS: usize = 16;

/// Pitch below which playback is treated as stalled
const MIN_PITCH: f32 = 0.01;

/// Slot of an emitter in its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmitterId(pub usize);

/// Emitter playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Not playing
    Stopped,
    /// Currently playing
    Playing,
    /// Paused
    Paused,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::Stopped
    }
}

/// Plays one clip at a time
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    state: PlaybackState,
    clip: Option<AudioClip>,
    settings: Option<ResolvedSettings>,
    cue: Option<String>,
    position: Vec3,
    looping: bool,
    /// Seconds into the current pass
    time: f32,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Busy emitters are not handed out by the pool; a paused emitter is busy
    pub fn is_busy(&self) -> bool {
        self.state != PlaybackState::Stopped
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn settings(&self) -> Option<&ResolvedSettings> {
        self.settings.as_ref()
    }

    /// Name of the cue being played, if it came from one
    pub fn cue(&self) -> Option<&str> {
        self.cue.as_deref()
    }

    pub fn kind(&self) -> AudioKind {
        self.settings.map(|s| s.kind).unwrap_or_default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Seconds into the current pass
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Seconds one pass of the clip lasts at the current pitch
    pub fn pass_duration(&self) -> f32 {
        let Some(clip) = &self.clip else {
            return 0.0;
        };
        let pitch = self.settings.map_or(1.0, |s| s.pitch.abs()).max(MIN_PITCH);
        clip.length / pitch
    }

    /// Start `clip` from the beginning
    pub fn play(
        &mut self,
        clip: AudioClip,
        settings: ResolvedSettings,
        looping: bool,
        position: Vec3,
        cue: Option<String>,
    ) {
        log::trace!("emitter playing {} (loop: {})", clip.name, looping);
        self.clip = Some(clip);
        self.settings = Some(settings);
        self.cue = cue;
        self.looping = looping;
        self.position = position;
        self.time = 0.0;
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    /// Stop right away
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
    }

    /// Let a looping clip end after its current pass
    pub fn finish(&mut self) {
        self.looping = false;
    }

    /// Advance playback. Returns true when the clip finished this tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.time += dt;

        let duration = self.pass_duration();
        if self.time < duration {
            return false;
        }
        if self.looping && duration > 0.0 {
            self.time %= duration;
            return false;
        }
        self.stop();
        true
    }
}

/// Fixed-size set of reusable emitters
#[derive(Debug, Clone)]
pub struct EmitterPool {
    emitters: Vec<Emitter>,
    max_emitters: usize,
}

impl Default for EmitterPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EMITTERS)
    }
}

impl EmitterPool {
    /// Pool growing up to `max_emitters` (clamped to `1..=32`)
    pub fn new(max_emitters: usize) -> Self {
        Self {
            emitters: Vec::new(),
            max_emitters: max_emitters.clamp(1, 32),
        }
    }

    pub fn max_emitters(&self) -> usize {
        self.max_emitters
    }

    /// Emitters created so far
    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Emitters currently busy
    pub fn active_count(&self) -> usize {
        self.emitters.iter().filter(|e| e.is_busy()).count()
    }

    /// A free emitter, creating one if the pool is not yet full
    pub fn acquire(&mut self) -> Option<EmitterId> {
        if let Some(index) = self.emitters.iter().position(|e| !e.is_busy()) {
            return Some(EmitterId(index));
        }
        if self.emitters.len() >= self.max_emitters {
            log::warn!("max emitter pool size reached ({})", self.max_emitters);
            return None;
        }
        self.emitters.push(Emitter::new());
        Some(EmitterId(self.emitters.len() - 1))
    }

    pub fn get(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.get(id.0)
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.emitters.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> {
        self.emitters.iter().enumerate().map(|(i, e)| (EmitterId(i), e))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EmitterId, &mut Emitter)> {
        self.emitters.iter_mut().enumerate().map(|(i, e)| (EmitterId(i), e))
    }

    /// Advance every emitter and return the ones that finished
    pub fn tick(&mut self, dt: f32) -> Vec<EmitterId> {
        self.iter_mut()
            .filter_map(|(id, e)| e.tick(dt).then_some(id))
            .collect()
    }

    pub fn stop_all(&mut self) {
        for emitter in &mut self.emitters {
            emitter.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfiguration;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings(pitch: f32) -> ResolvedSettings {
        AudioConfiguration::default()
            .with_pitch(pitch, 0.0)
            .resolve(&mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn test_one_shot_finishes_after_length() {
        let mut emitter = Emitter::new();
        emitter.play(AudioClip::new("shot", 1.0), settings(1.0), false, Vec3::ZERO, None);
        assert!(!emitter.tick(0.5));
        assert!(emitter.is_playing());
        assert!(emitter.tick(0.5));
        assert_eq!(emitter.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_pitch_scales_duration() {
        let mut emitter = Emitter::new();
        emitter.play(AudioClip::new("shot", 1.0), settings(2.0), false, Vec3::ZERO, None);
        assert_abs_diff_eq!(emitter.pass_duration(), 0.5);
        assert!(emitter.tick(0.5));
    }

    #[test]
    fn test_loop_until_finish() {
        let mut emitter = Emitter::new();
        emitter.play(AudioClip::new("hum", 1.0), settings(1.0), true, Vec3::ZERO, Some("hum".into()));
        for _ in 0..10 {
            assert!(!emitter.tick(0.25));
        }
        // 2.5s in: half a pass left after finish
        emitter.finish();
        assert!(!emitter.tick(0.25));
        assert!(emitter.tick(0.25));
        assert!(!emitter.is_busy());
    }

    #[test]
    fn test_pause_holds_time() {
        let mut emitter = Emitter::new();
        emitter.play(AudioClip::new("shot", 1.0), settings(1.0), false, Vec3::ZERO, None);
        emitter.tick(0.5);
        emitter.pause();
        assert!(!emitter.tick(5.0));
        assert!(emitter.is_busy());
        emitter.resume();
        assert!(emitter.tick(0.5));
    }

    #[test]
    fn test_pool_reuses_and_caps() {
        let mut pool = EmitterPool::new(2);
        let a = pool.acquire().unwrap();
        pool.get_mut(a)
            .unwrap()
            .play(AudioClip::new("a", 1.0), settings(1.0), false, Vec3::ZERO, None);

        // Not playing yet: handed out again
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.acquire(), Some(b));
        pool.get_mut(b)
            .unwrap()
            .play(AudioClip::new("b", 2.0), settings(1.0), false, Vec3::ZERO, None);

        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.active_count(), 2);

        assert_eq!(pool.tick(1.0), vec![a]);
        assert_eq!(pool.acquire(), Some(a));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_size_clamped() {
        assert_eq!(EmitterPool::new(0).max_emitters(), 1);
        assert_eq!(EmitterPool::new(100).max_emitters(), 32);
        assert_eq!(EmitterPool::default().max_emitters(), DEFAULT_MAX_EMITTERS);
    }
}
