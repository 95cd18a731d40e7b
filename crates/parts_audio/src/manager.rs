//! Audio manager: cue library, emitter pool and mixer behind a request channel

use crate::config::{AudioConfiguration, AudioKind};
use crate::cue::{AudioClip, AudioCue};
use crate::emitter::{EmitterId, EmitterPool, DEFAULT_MAX_EMITTERS};
use crate::mixer::Mixer;
use glam::Vec3;
use parts_event::EventChannel;
use parts_gamestate::SharedPrefs;
use rand::Rng;
use std::collections::HashMap;

/// Request to play a registered cue
#[derive(Debug, Clone, PartialEq)]
pub struct CueRequest {
    pub cue: String,
    /// Settings for this playback; the manager's default when absent
    pub config: Option<AudioConfiguration>,
    pub position: Vec3,
}

impl CueRequest {
    pub fn new(cue: impl Into<String>) -> Self {
        Self {
            cue: cue.into(),
            config: None,
            position: Vec3::ZERO,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_config(mut self, config: AudioConfiguration) -> Self {
        self.config = Some(config);
        self
    }
}

/// Plays cues on pooled emitters. Built once and handed to whoever needs
/// it; gameplay code only holds a clone of the request channel.
#[derive(Debug)]
pub struct AudioManager {
    cues: HashMap<String, AudioCue>,
    pool: EmitterPool,
    mixer: Mixer,
    requests: EventChannel<CueRequest>,
    default_config: AudioConfiguration,
}

impl AudioManager {
    pub fn new(prefs: SharedPrefs, requests: EventChannel<CueRequest>) -> Self {
        Self {
            cues: HashMap::new(),
            pool: EmitterPool::new(DEFAULT_MAX_EMITTERS),
            mixer: Mixer::new(prefs),
            requests,
            default_config: AudioConfiguration::default(),
        }
    }

    pub fn with_max_emitters(mut self, max: usize) -> Self {
        self.pool = EmitterPool::new(max);
        self
    }

    pub fn with_default_config(mut self, config: AudioConfiguration) -> Self {
        self.default_config = config;
        self
    }

    /// Add a cue, replacing one with the same name
    pub fn register_cue(&mut self, cue: AudioCue) {
        self.cues.insert(cue.name.clone(), cue);
    }

    pub fn has_cue(&self, name: &str) -> bool {
        self.cues.contains_key(name)
    }

    /// Sender half for gameplay code
    pub fn requests(&self) -> EventChannel<CueRequest> {
        self.requests.clone()
    }

    pub fn pool(&self) -> &EmitterPool {
        &self.pool
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    /// Play every queued request. Returns how many emitters started.
    pub fn process(&mut self, rng: &mut impl Rng) -> usize {
        self.mixer.sync();
        let mut started = 0;
        while let Some(request) = self.requests.receive() {
            started += self.play_cue(&request.cue, request.config.as_ref(), request.position, rng).len();
        }
        started
    }

    /// Play one clip from each group of a cue
    pub fn play_cue(
        &mut self,
        name: &str,
        config: Option<&AudioConfiguration>,
        position: Vec3,
        rng: &mut impl Rng,
    ) -> Vec<EmitterId> {
        let Some(cue) = self.cues.get_mut(name) else {
            log::warn!("unknown audio cue {}", name);
            return Vec::new();
        };
        let looping = cue.looping;
        let clips = cue.next_clips(rng);
        let config = config.unwrap_or(&self.default_config).clone();

        let mut started = Vec::with_capacity(clips.len());
        for clip in clips {
            let Some(id) = self.pool.acquire() else {
                break;
            };
            if let Some(emitter) = self.pool.get_mut(id) {
                emitter.play(clip, config.resolve(rng), looping, position, Some(name.to_string()));
                started.push(id);
            }
        }
        started
    }

    /// Play a bare clip once with the default settings
    pub fn play_clip(&mut self, clip: AudioClip, rng: &mut impl Rng) -> Option<EmitterId> {
        let id = self.pool.acquire()?;
        let settings = self.default_config.resolve(rng);
        let emitter = self.pool.get_mut(id)?;
        emitter.play(clip, settings, false, Vec3::ZERO, None);
        Some(id)
    }

    /// Stop every emitter playing `cue`. Returns how many stopped.
    pub fn stop_cue(&mut self, cue: &str) -> usize {
        let mut stopped = 0;
        for (_, emitter) in self.pool.iter_mut() {
            if emitter.is_busy() && emitter.cue() == Some(cue) {
                emitter.stop();
                stopped += 1;
            }
        }
        stopped
    }

    /// Let every looping emitter of `cue` end after its current pass
    pub fn finish_cue(&mut self, cue: &str) {
        for (_, emitter) in self.pool.iter_mut() {
            if emitter.is_busy() && emitter.cue() == Some(cue) {
                emitter.finish();
            }
        }
    }

    /// Pause or resume sound effects; music keeps playing
    pub fn set_paused(&mut self, paused: bool) {
        for (_, emitter) in self.pool.iter_mut() {
            if emitter.kind() != AudioKind::Sfx {
                continue;
            }
            if paused {
                emitter.pause();
            } else {
                emitter.resume();
            }
        }
    }

    /// Level an emitter is heard at: its own volume through its mixer group
    pub fn output_volume(&self, id: EmitterId) -> f32 {
        self.pool
            .get(id)
            .and_then(|e| e.settings().map(|s| s.volume * self.mixer.output_volume(s.kind)))
            .unwrap_or(0.0)
    }

    /// Advance playback; returns emitters that finished
    pub fn tick(&mut self, dt: f32) -> Vec<EmitterId> {
        self.pool.tick(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::{ClipGroup, SequenceMode};
    use crate::emitter::PlaybackState;
    use crate::mixer::MixerGroup;
    use approx::assert_abs_diff_eq;
    use parts_gamestate::Prefs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manager() -> AudioManager {
        let mut audio = AudioManager::new(Prefs::new().shared(), EventChannel::new()).with_max_emitters(3);
        audio.register_cue(AudioCue::new("shot").with_group(ClipGroup::new(
            vec![AudioClip::new("shot_a", 0.5), AudioClip::new("shot_b", 0.5)],
            SequenceMode::Sequential,
        )));
        audio.register_cue(
            AudioCue::new("theme")
                .with_group(ClipGroup::single(AudioClip::new("theme", 4.0)))
                .looping(),
        );
        audio
    }

    #[test]
    fn test_requests_play_on_pool() {
        let mut audio = manager();
        let mut rng = StdRng::seed_from_u64(5);
        let requests = audio.requests();
        requests.send(CueRequest::new("shot").at(Vec3::X));
        requests.send(CueRequest::new("shot"));
        requests.send(CueRequest::new("missing"));
        assert_eq!(audio.process(&mut rng), 2);

        let names: Vec<&str> = audio
            .pool()
            .iter()
            .filter_map(|(_, e)| e.clip().map(|c| c.name.as_str()))
            .collect();
        assert_eq!(names, vec!["shot_a", "shot_b"]);
        assert_eq!(audio.pool().get(EmitterId(0)).map(|e| e.position()), Some(Vec3::X));

        assert_eq!(audio.tick(0.5).len(), 2);
        assert_eq!(audio.pool().active_count(), 0);
    }

    #[test]
    fn test_full_pool_drops_request() {
        let mut audio = manager();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..3 {
            assert_eq!(audio.play_cue("shot", None, Vec3::ZERO, &mut rng).len(), 1);
        }
        assert!(audio.play_cue("shot", None, Vec3::ZERO, &mut rng).is_empty());
        assert!(audio.play_clip(AudioClip::new("click", 0.1), &mut rng).is_none());
    }

    #[test]
    fn test_music_loops_until_finished() {
        let mut audio = manager();
        let mut rng = StdRng::seed_from_u64(5);
        let ids = audio.play_cue("theme", Some(&AudioConfiguration::music()), Vec3::ZERO, &mut rng);
        assert_eq!(ids.len(), 1);
        for _ in 0..10 {
            assert!(audio.tick(1.0).is_empty());
        }

        // Pausing the game leaves music alone
        audio.set_paused(true);
        assert_eq!(audio.pool().get(ids[0]).map(|e| e.state()), Some(PlaybackState::Playing));

        audio.finish_cue("theme");
        assert!(audio.tick(1.0).is_empty());
        assert_eq!(audio.tick(1.0), ids);
    }

    #[test]
    fn test_pause_and_stop_sfx() {
        let mut audio = manager();
        let mut rng = StdRng::seed_from_u64(5);
        let ids = audio.play_cue("shot", None, Vec3::ZERO, &mut rng);
        audio.set_paused(true);
        assert!(audio.tick(1.0).is_empty());
        audio.set_paused(false);
        assert_eq!(audio.stop_cue("shot"), 1);
        assert!(audio.tick(1.0).is_empty());
        assert_eq!(audio.pool().get(ids[0]).map(|e| e.is_busy()), Some(false));
    }

    #[test]
    fn test_output_volume_through_mixer() {
        let mut audio = manager();
        let mut rng = StdRng::seed_from_u64(5);
        let config = AudioConfiguration::default().with_volume(0.8, 0.0);
        let ids = audio.play_cue("shot", Some(&config), Vec3::ZERO, &mut rng);
        audio.mixer_mut().set_group_volume(MixerGroup::Sfx, 0.5);
        assert_abs_diff_eq!(audio.output_volume(ids[0]), 0.4, epsilon = 1e-5);
        assert_eq!(audio.output_volume(EmitterId(9)), 0.0);
    }
}
