//! Multi-track animation sequences: the `animations` attribute grammar and the sequencer that
//! queues them on an [`AnimationState`].
//!
//! Grammar: any number of bracketed groups.
//! - `[track,name,loop,delay,mix]` queues `name` on `track`; `loop`, `delay` and `mix` are
//!   optional. `#EMPTY#` as the name queues an empty animation.
//! - `[loop,track,repeatDelay]` makes `track` cyclic: when its last entry completes, the whole
//!   sequence is queued again after `repeatDelay` seconds.

use crate::{AnimationState, Error, TrackEntryId};
use std::collections::{BTreeMap, HashMap};

pub const EMPTY_ANIMATION: &str = "#EMPTY#";

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationEntry {
    /// `None` for an empty animation.
    pub animation: Option<String>,
    pub looping: bool,
    pub delay: Option<f32>,
    pub mix_duration: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackSequence {
    pub entries: Vec<AnimationEntry>,
    pub cycle: bool,
    pub repeat_delay: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationsConfig {
    pub tracks: BTreeMap<usize, TrackSequence>,
}

impl AnimationsConfig {
    pub fn parse(value: &str) -> Result<Self, Error> {
        let mut config = Self::default();
        for group in groups(value) {
            let fields: Vec<&str> = group.split(',').map(str::trim).collect();
            let field = |index: usize| fields.get(index).copied().filter(|f| !f.is_empty());

            if field(0) == Some("loop") {
                let track = parse_track(field(1), group, value)?;
                let sequence = config.tracks.entry(track).or_default();
                sequence.cycle = true;
                if let Some(repeat_delay) = field(2) {
                    sequence.repeat_delay = parse_number(repeat_delay, "repeat delay", group, value)?;
                }
                continue;
            }

            let track = parse_track(field(0), group, value)?;
            let name = field(1).ok_or_else(|| invalid(group, value, "missing animation name"))?;
            let looping = field(2).is_some_and(|l| l.eq_ignore_ascii_case("true"));
            let delay = field(3)
                .map(|d| parse_number(d, "delay", group, value))
                .transpose()?;
            let mix_duration = field(4)
                .map(|m| parse_number(m, "mix duration", group, value))
                .transpose()?;

            config.tracks.entry(track).or_default().entries.push(AnimationEntry {
                animation: (name != EMPTY_ANIMATION).then(|| name.to_string()),
                looping,
                delay,
                mix_duration,
            });
        }
        Ok(config)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(|t| t.entries.is_empty())
    }

    /// Names of every non-empty animation, in track order.
    pub fn animation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for sequence in self.tracks.values() {
            for entry in &sequence.entries {
                if let Some(name) = &entry.animation {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }
}

fn groups(value: &str) -> impl Iterator<Item = &str> {
    value.split('[').skip(1).filter_map(|rest| {
        let end = rest.find(']')?;
        let inner = &rest[..end];
        (!inner.trim().is_empty()).then_some(inner)
    })
}

fn parse_track(field: Option<&str>, group: &str, value: &str) -> Result<usize, Error> {
    let field = field.unwrap_or_default();
    field
        .parse::<usize>()
        .map_err(|_| invalid(group, value, format!("track index must be a non-negative integer, got '{field}'")))
}

fn parse_number(field: &str, what: &str, group: &str, value: &str) -> Result<f32, Error> {
    field
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(group, value, format!("{what} must be a number, got '{field}'")))
}

fn invalid(group: &str, value: &str, message: impl Into<String>) -> Error {
    Error::InvalidAnimationSequence {
        group: format!("[{group}]"),
        value: value.to_string(),
        message: message.into(),
    }
}

/// Queues [`AnimationsConfig`] sequences on an animation state and re-queues cyclic tracks.
#[derive(Clone, Debug, Default)]
pub struct AnimationSequencer {
    config: AnimationsConfig,
    /// Last entry of each cyclic track, awaiting completion.
    watched: HashMap<TrackEntryId, usize>,
    /// Cyclic tracks waiting out their repeat delay.
    pending: Vec<(usize, f32)>,
}

impl AnimationSequencer {
    pub fn new(config: AnimationsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AnimationsConfig {
        &self.config
    }

    /// Clears the state's tracks and queues every track sequence.
    pub fn start<A: AnimationState>(&mut self, state: &mut A) -> Result<(), Error> {
        self.watched.clear();
        self.pending.clear();
        state.clear_tracks();
        let tracks: Vec<usize> = self.config.tracks.keys().copied().collect();
        for track in tracks {
            self.queue_track(state, track)?;
        }
        Ok(())
    }

    fn queue_track<A: AnimationState>(&mut self, state: &mut A, track: usize) -> Result<(), Error> {
        let Some(sequence) = self.config.tracks.get(&track) else {
            return Ok(());
        };
        let last = sequence.entries.len().saturating_sub(1);

        for (index, entry) in sequence.entries.iter().enumerate() {
            let mix = entry.mix_duration.unwrap_or(0.0);
            let delay = entry.delay.unwrap_or(0.0);
            let id = match (&entry.animation, index) {
                (None, 0) => state.set_empty_animation(track, mix),
                (None, _) => state.add_empty_animation(track, mix, delay),
                (Some(name), 0) => state.set_animation(track, name, entry.looping)?,
                (Some(name), _) => state.add_animation(track, name, entry.looping, delay)?,
            };
            if let Some(mix) = entry.mix_duration.filter(|m| *m != 0.0) {
                state.set_mix_duration(id, mix);
            }
            if sequence.cycle && index == last {
                self.watched.insert(id, track);
            }
        }
        Ok(())
    }

    /// Advances repeat delays by `delta` and re-queues cyclic tracks whose last entry completed.
    pub fn update<A: AnimationState>(&mut self, state: &mut A, delta: f32) {
        for id in state.take_completed() {
            if let Some(track) = self.watched.remove(&id) {
                let repeat_delay = self
                    .config
                    .tracks
                    .get(&track)
                    .map_or(0.0, |s| s.repeat_delay);
                self.pending.push((track, repeat_delay));
            }
        }

        let mut due = Vec::new();
        self.pending.retain_mut(|(track, remaining)| {
            *remaining -= delta;
            if *remaining <= 0.0 {
                due.push(*track);
                false
            } else {
                true
            }
        });

        for track in due {
            if let Err(err) = self.queue_track(state, track) {
                log::warn!("animation sequence on track {track}: {err}");
            }
        }
    }
}
