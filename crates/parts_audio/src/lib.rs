//! Parts Audio - Cues, Emitters and Mixing
//!
//! Sound is requested as named cues. The manager picks a clip from each of
//! the cue's groups, finds a free emitter in a fixed-size pool and applies a
//! playback configuration. Playback is headless: emitters only keep time so
//! the pool knows when they are free again.
//!
//! # Features
//!
//! - Clip groups played at random, at random without repeats, or in order
//! - Playback configuration with volume and pitch variation
//! - Emitter pool with reuse and a hard cap
//! - Master, SFX and music groups in decibels, persisted to prefs
//!
//! # Example
//!
//! ```ignore
//! use parts_audio::prelude::*;
//!
//! let mut audio = AudioManager::new(prefs.clone(), EventChannel::new());
//! audio.register_cue(AudioCue::new("shot").with_group(ClipGroup::new(clips, SequenceMode::Random)));
//!
//! audio.requests().send(CueRequest::new("shot").at(muzzle_position));
//! audio.process(&mut rng);
//! audio.tick(dt);
//! ```

pub mod config;
pub mod cue;
pub mod emitter;
pub mod manager;
pub mod mixer;

pub mod prelude {
    pub use crate::config::{AudioConfiguration, AudioKind, Priority, ResolvedSettings};
    pub use crate::cue::{AudioClip, AudioCue, ClipGroup, SequenceMode};
    pub use crate::emitter::{Emitter, EmitterId, EmitterPool, PlaybackState, DEFAULT_MAX_EMITTERS};
    pub use crate::manager::{AudioManager, CueRequest};
    pub use crate::mixer::{db_to_linear, linear_to_db, Mixer, MixerGroup, SILENT_DB};
}

pub use prelude::*;
