use serde::{Deserialize, Serialize};

use crate::{
    animation::{AnimationConfig, AnimationVariant},
    InductionError, PhaseTimeline, Result,
};

mod brainwave;

pub use brainwave::{BeatBand, BrainwaveState, Palette};

pub const DEFAULT_BASE_FREQUENCY: f64 = 200.0;
pub const DEFAULT_CHANNEL_OFFSET: f64 = 10.0;
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Numeric bounds applied to the binaural parameters.
///
/// Deployments disagree on which ranges are canonical, so every bound lives
/// here instead of in the audio code. `audible_*` is the final clamp applied to
/// the tone frequencies actually sent to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyLimits {
    pub base_min: f64,
    pub base_max: f64,
    pub offset_min: f64,
    pub offset_max: f64,
    pub audible_min: f64,
    pub audible_max: f64,
}

impl Default for FrequencyLimits {
    fn default() -> Self {
        Self {
            base_min: 100.0,
            base_max: 1000.0,
            offset_min: 0.5,
            offset_max: 50.0,
            audible_min: 20.0,
            audible_max: 20_000.0,
        }
    }
}

impl FrequencyLimits {
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("base", self.base_min, self.base_max),
            ("offset", self.offset_min, self.offset_max),
            ("audible", self.audible_min, self.audible_max),
        ];
        for (name, lo, hi) in ranges {
            if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 || lo > hi {
                return Err(InductionError::config(format!(
                    "{name} frequency limits [{lo}, {hi}] are not a valid positive range"
                )));
            }
        }
        Ok(())
    }

    pub fn check_base(&self, hz: f64) -> Result<()> {
        check_range("base frequency", hz, self.base_min, self.base_max)
    }

    pub fn check_offset(&self, hz: f64) -> Result<()> {
        check_range("channel offset", hz, self.offset_min, self.offset_max)
    }

    /// Clamps a tone frequency into the audible range.
    pub fn clamp_audible(&self, hz: f64) -> f64 {
        hz.clamp(self.audible_min, self.audible_max)
    }
}

fn check_range(name: &str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(InductionError::config(format!(
            "{name} {value} Hz outside [{lo}, {hi}]"
        )))
    }
}

/// Binaural parameters. The left ear receives `base_frequency`, the right
/// ear `base_frequency + channel_offset`.
///
/// Inside a [`SessionConfig`] the `playing` flag requests audio at session
/// start; on a live engine it reports whether the graph is running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParameters {
    pub base_frequency: f64,
    pub channel_offset: f64,
    pub playing: bool,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            base_frequency: DEFAULT_BASE_FREQUENCY,
            channel_offset: DEFAULT_CHANNEL_OFFSET,
            playing: true,
        }
    }
}

impl AudioParameters {
    pub fn left_frequency(&self) -> f64 {
        self.base_frequency
    }

    pub fn right_frequency(&self) -> f64 {
        self.base_frequency + self.channel_offset
    }
}

/// Full description of an induction session, handed to
/// [`InductionController::start_induction`](crate::InductionController::start_induction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub audio: AudioParameters,
    pub volume: f32,
    pub enable_visual_stimuli: bool,
    pub stimuli_type: i32,
    pub animation: AnimationConfig,
    pub timeline: PhaseTimeline,
    pub limits: FrequencyLimits,
    pub cues_enabled: bool,
    pub intended_state: Option<BrainwaveState>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            audio: AudioParameters::default(),
            volume: DEFAULT_VOLUME,
            enable_visual_stimuli: false,
            stimuli_type: 0,
            animation: AnimationConfig::default_for(AnimationVariant::ColorSwap),
            timeline: PhaseTimeline::default(),
            limits: FrequencyLimits::default(),
            cues_enabled: true,
            intended_state: None,
        }
    }
}

impl SessionConfig {
    /// Checks every part of the configuration without touching any subsystem.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.limits.check_base(self.audio.base_frequency)?;
        self.limits.check_offset(self.audio.channel_offset)?;
        if !self.volume.is_finite() {
            return Err(InductionError::config("volume must be a finite number"));
        }
        self.timeline.validate()?;

        let declared = AnimationVariant::from_stimuli_type(self.stimuli_type);
        if declared != self.animation.variant() {
            return Err(InductionError::config(format!(
                "stimuli type {} selects {declared:?} but the animation config is {:?}",
                self.stimuli_type,
                self.animation.variant()
            )));
        }
        self.animation.validate(&self.timeline)
    }

    /// Replaces the animation with the defaults of the variant selected by
    /// `stimuli_type`.
    pub fn with_stimuli_type(mut self, stimuli_type: i32) -> Self {
        let variant = AnimationVariant::from_stimuli_type(stimuli_type);
        self.stimuli_type = stimuli_type;
        if self.animation.variant() != variant {
            self.animation = AnimationConfig::default_for(variant);
        }
        self
    }

    /// Tunes the beat to the band's default frequency and, for the bouncy
    /// ball, switches to the band's colours. Limits are not checked here.
    pub fn apply_brainwave_state(&mut self, state: BrainwaveState) {
        self.audio.channel_offset = state.band().default;
        if let AnimationConfig::BouncyBall(ball) = &mut self.animation {
            ball.apply_palette(state.palette());
        }
        self.intended_state = Some(state);
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds a session from the flat persisted keys, keeping everything the
    /// store does not carry at its default.
    pub fn from_persisted(persisted: &PersistedSettings) -> Result<Self> {
        let mut config = Self::default().with_stimuli_type(persisted.stimuli_type);
        config.audio.base_frequency = persisted.base_frequency;
        config.audio.channel_offset = persisted.channel_offset;
        config.enable_visual_stimuli = persisted.enable_visual_stimuli;
        config.timeline = config.timeline.with_durations(persisted.phase_durations)?;
        Ok(config)
    }

    pub fn to_persisted(&self) -> PersistedSettings {
        PersistedSettings {
            base_frequency: self.audio.base_frequency,
            channel_offset: self.audio.channel_offset,
            enable_visual_stimuli: self.enable_visual_stimuli,
            stimuli_type: self.stimuli_type,
            phase_durations: self.timeline.durations(),
        }
    }
}

/// The keys an external settings store keeps between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    pub base_frequency: f64,
    pub channel_offset: f64,
    pub enable_visual_stimuli: bool,
    pub stimuli_type: i32,
    pub phase_durations: [f64; 4],
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            base_frequency: DEFAULT_BASE_FREQUENCY,
            channel_offset: DEFAULT_CHANNEL_OFFSET,
            enable_visual_stimuli: false,
            stimuli_type: 0,
            phase_durations: [4.0; 4],
        }
    }
}

/// Source of session defaults. Storage is up to the implementor.
pub trait SettingsProvider {
    fn get_defaults(&self) -> Result<SessionConfig>;
    fn set_defaults(&mut self, config: &SessionConfig) -> Result<()>;
}

/// Settings provider that keeps the defaults in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    defaults: SessionConfig,
}

impl MemorySettings {
    pub fn new(defaults: SessionConfig) -> Self {
        Self { defaults }
    }
}

impl SettingsProvider for MemorySettings {
    fn get_defaults(&self) -> Result<SessionConfig> {
        Ok(self.defaults.clone())
    }

    fn set_defaults(&mut self, config: &SessionConfig) -> Result<()> {
        config.validate()?;
        self.defaults = config.clone();
        Ok(())
    }
}
