//! Audio collaborator interface
//!
//! The core decides *when* and *how loud*; synthesis and sample playback
//! belong to whatever implements [`AudioSink`].

use serde::Serialize;

/// Loudest an impact may play
const MAX_IMPACT_VOLUME: f32 = 0.4;
/// Impacts quieter than this are dropped
const MIN_IMPACT_VOLUME: f32 = 0.02;
/// Sample playback rate bounds
const MIN_SAMPLE_RATE: f32 = 0.1;
const MAX_SAMPLE_RATE: f32 = 4.0;

/// Sound effect requests
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SoundEffect {
    /// Notification ding as a drop enters the pit
    Chime,
    /// Procedural bounce/boom
    Impact { intensity: f32, radius: f32 },
    /// Pre-loaded sample (duck quack, toaster clank)
    Sample { key: String, rate: f32 },
}

impl SoundEffect {
    pub fn impact(intensity: f32, radius: f32) -> Self {
        SoundEffect::Impact { intensity, radius }
    }

    /// Sample at a playback rate clamped to the supported range
    pub fn sample(key: impl Into<String>, rate: f32) -> Self {
        let rate = if rate.is_finite() { rate } else { 1.0 };
        SoundEffect::Sample {
            key: key.into(),
            rate: rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE),
        }
    }

    /// Playback volume before master gain; `None` means inaudible, skip it
    pub fn volume(&self) -> Option<f32> {
        match self {
            SoundEffect::Chime => Some(0.3),
            SoundEffect::Impact { intensity, .. } => {
                let vol = (intensity * 0.1).min(MAX_IMPACT_VOLUME);
                (vol >= MIN_IMPACT_VOLUME).then_some(vol)
            }
            SoundEffect::Sample { .. } => Some(0.5),
        }
    }

    /// Starting pitch in Hz for procedural effects (smaller bodies ring higher)
    pub fn frequency(&self) -> Option<f32> {
        match self {
            SoundEffect::Chime => Some(800.0),
            SoundEffect::Impact { intensity, radius } => {
                let radius = if *radius > 0.0 { *radius } else { 30.0 };
                Some(25000.0 / radius + intensity * 10.0)
            }
            SoundEffect::Sample { .. } => None,
        }
    }
}

/// Anything that can play sound effects
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
}

/// Volume and mute gate in front of another sink
pub struct AudioManager<S: AudioSink> {
    sink: S,
    master_volume: f32,
    muted: bool,
}

impl<S: AudioSink> AudioManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            muted: false,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn master_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    pub fn inner(&self) -> &S {
        &self.sink
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Resolve an effect into what a synth needs, master gain applied
    pub fn cue<'a>(&self, effect: &'a SoundEffect) -> Option<SoundCue<'a>> {
        let volume = effect.volume()? * self.master_volume();
        (volume > 0.0).then(|| SoundCue {
            effect,
            volume,
            frequency: effect.frequency(),
        })
    }
}

/// A playable sound for a host synth
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundCue<'a> {
    #[serde(flatten)]
    pub effect: &'a SoundEffect,
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
}

impl<S: AudioSink> AudioSink for AudioManager<S> {
    fn play(&mut self, effect: SoundEffect) {
        if self.master_volume() <= 0.0 || effect.volume().is_none() {
            return;
        }
        self.sink.play(effect);
    }
}

/// Sink that just remembers what was requested
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    pub played: Vec<SoundEffect>,
}

impl RecordingAudio {
    pub fn chimes(&self) -> usize {
        self.played
            .iter()
            .filter(|e| matches!(e, SoundEffect::Chime))
            .count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, effect: SoundEffect) {
        log::trace!("play {:?}", effect);
        self.played.push(effect);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, _effect: SoundEffect) {}
}
