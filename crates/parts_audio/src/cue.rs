//! Audio cues and clip sequencing

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A sound asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub name: String,
    /// Duration in seconds at pitch 1
    pub length: f32,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length: length.max(0.0),
        }
    }
}

/// How a group picks its next clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceMode {
    /// Any clip, repeats allowed
    Random,
    /// Any clip but the one played last
    RandomNoImmediateRepeat,
    /// In order, wrapping around
    Sequential,
}

impl Default for SequenceMode {
    fn default() -> Self {
        Self::RandomNoImmediateRepeat
    }
}

/// Variations of one sound
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipGroup {
    pub clips: Vec<AudioClip>,
    pub mode: SequenceMode,
    #[serde(skip)]
    last: Option<usize>,
}

impl ClipGroup {
    pub fn new(clips: Vec<AudioClip>, mode: SequenceMode) -> Self {
        Self { clips, mode, last: None }
    }

    pub fn single(clip: AudioClip) -> Self {
        Self::new(vec![clip], SequenceMode::default())
    }

    /// Index of the clip picked last
    pub fn last_index(&self) -> Option<usize> {
        self.last
    }

    /// Pick the next clip. The first pick is the first clip in sequential
    /// mode and a random one otherwise.
    pub fn next_clip(&mut self, rng: &mut impl Rng) -> Option<&AudioClip> {
        let count = self.clips.len();
        let index = match count {
            0 => return None,
            1 => 0,
            _ => match (self.last, self.mode) {
                (None, SequenceMode::Sequential) => 0,
                (None, _) | (Some(_), SequenceMode::Random) => rng.gen_range(0..count),
                (Some(last), SequenceMode::Sequential) => (last + 1) % count,
                (Some(last), SequenceMode::RandomNoImmediateRepeat) => {
                    // Uniform over every clip but the last
                    let pick = rng.gen_range(0..count - 1);
                    if pick >= last {
                        pick + 1
                    } else {
                        pick
                    }
                }
            },
        };
        self.last = Some(index);
        self.clips.get(index)
    }
}

/// A named sound made of one or more clip groups played together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioCue {
    pub name: String,
    pub groups: Vec<ClipGroup>,
    /// Play until stopped or finished
    pub looping: bool,
}

impl AudioCue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            looping: false,
        }
    }

    pub fn with_group(mut self, group: ClipGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Next clip of every group that has one
    pub fn next_clips(&mut self, rng: &mut impl Rng) -> Vec<AudioClip> {
        self.groups
            .iter_mut()
            .filter_map(|g| g.next_clip(rng).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clips(n: usize) -> Vec<AudioClip> {
        (0..n).map(|i| AudioClip::new(format!("clip{}", i), 1.0)).collect()
    }

    fn picks(group: &mut ClipGroup, rng: &mut StdRng, n: usize) -> Vec<usize> {
        (0..n)
            .map(|_| {
                group.next_clip(rng);
                group.last_index().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sequential_wraps() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut group = ClipGroup::new(clips(3), SequenceMode::Sequential);
        assert_eq!(picks(&mut group, &mut rng, 7), vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_no_immediate_repeat() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut group = ClipGroup::new(clips(2), SequenceMode::RandomNoImmediateRepeat);
        let seq = picks(&mut group, &mut rng, 50);
        for pair in seq.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut group = ClipGroup::new(clips(4), SequenceMode::Random);
        assert!(picks(&mut group, &mut rng, 50).iter().all(|i| *i < 4));
    }

    #[test]
    fn test_single_and_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut single = ClipGroup::single(AudioClip::new("only", 0.5));
        for _ in 0..3 {
            assert_eq!(single.next_clip(&mut rng).map(|c| c.name.as_str()), Some("only"));
        }
        let mut empty = ClipGroup::default();
        assert_eq!(empty.next_clip(&mut rng), None);
    }

    #[test]
    fn test_cue_picks_per_group() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cue = AudioCue::new("explosion")
            .with_group(ClipGroup::new(clips(3), SequenceMode::Sequential))
            .with_group(ClipGroup::single(AudioClip::new("debris", 2.0)))
            .with_group(ClipGroup::default());
        let picked = cue.next_clips(&mut rng);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].name, "clip0");
        assert_eq!(picked[1].name, "debris");
    }
}
