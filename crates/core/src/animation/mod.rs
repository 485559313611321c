//! Phase-driven animations.
//!
//! An animation turns a scheduler position `(phase_index, elapsed_in_phase)`
//! into a [`RenderState`]. The variants form a closed set selected by
//! [`AnimationVariant`]; they share the trailing crossfade rule implemented by
//! [`phase_crossfade`].

use serde::{Deserialize, Serialize};

use crate::{InductionError, Palette, PhaseTimeline, RenderState, Result, PHASE_COUNT};

mod bouncy_ball;
mod color_swap;

pub use bouncy_ball::{BouncyBall, BouncyBallConfig, Easing};
pub use color_swap::{ColorSwap, ColorSwapConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || InductionError::config(format!("`{hex}` is not a #RRGGBB[AA] colour"));
        if !(digits.len() == 6 || digits.len() == 8)
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(invalid());
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| invalid())
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    /// Linear interpolation; `t = 0` yields `self` and `t = 1` yields `other`
    /// exactly.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Progress through the trailing fade window of a phase, in `[0, 1]`.
///
/// Zero until `duration - fade_duration`, then linear up to one at the
/// boundary.
pub fn fade_factor(elapsed: f64, duration: f64, fade_duration: f64) -> f32 {
    if fade_duration <= 0.0 {
        return 0.0;
    }
    let window_start = duration - fade_duration;
    if elapsed < window_start {
        return 0.0;
    }
    ((elapsed - window_start) / fade_duration).clamp(0.0, 1.0) as f32
}

/// Colour of phase `index` crossfading into the colour of the next phase.
pub fn phase_crossfade(
    colors: &[Rgba; PHASE_COUNT],
    index: usize,
    elapsed: f64,
    duration: f64,
    fade_duration: f64,
) -> Rgba {
    let index = index % PHASE_COUNT;
    let current = colors[index];
    let next = colors[(index + 1) % PHASE_COUNT];
    current.lerp(next, fade_factor(elapsed, duration, fade_duration))
}

fn validate_fade(fade_duration: f64, timeline: &PhaseTimeline) -> Result<()> {
    if !fade_duration.is_finite() || fade_duration < 0.0 {
        return Err(InductionError::config(format!(
            "fade duration {fade_duration} must be a non-negative number of seconds"
        )));
    }
    if let Some(shortest) = timeline.min_active_duration() {
        if fade_duration > shortest {
            return Err(InductionError::config(format!(
                "fade duration {fade_duration}s exceeds the shortest active phase ({shortest}s)"
            )));
        }
    }
    Ok(())
}

/// Tag selecting an animation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationVariant {
    ColorSwap,
    BouncyBall,
}

impl AnimationVariant {
    /// Maps the persisted `stimuli_type` integer. `1` was a pulse animation
    /// that has always rendered as the bouncy ball; unknown values fall back
    /// to the colour swap.
    pub fn from_stimuli_type(stimuli_type: i32) -> Self {
        match stimuli_type {
            1 | 2 => AnimationVariant::BouncyBall,
            _ => AnimationVariant::ColorSwap,
        }
    }

    pub fn stimuli_type(self) -> i32 {
        match self {
            AnimationVariant::ColorSwap => 0,
            AnimationVariant::BouncyBall => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum AnimationConfig {
    ColorSwap(ColorSwapConfig),
    BouncyBall(BouncyBallConfig),
}

impl AnimationConfig {
    pub fn default_for(variant: AnimationVariant) -> Self {
        match variant {
            AnimationVariant::ColorSwap => AnimationConfig::ColorSwap(ColorSwapConfig::default()),
            AnimationVariant::BouncyBall => AnimationConfig::BouncyBall(BouncyBallConfig::default()),
        }
    }

    pub fn variant(&self) -> AnimationVariant {
        match self {
            AnimationConfig::ColorSwap(_) => AnimationVariant::ColorSwap,
            AnimationConfig::BouncyBall(_) => AnimationVariant::BouncyBall,
        }
    }

    pub fn fade_duration(&self) -> f64 {
        match self {
            AnimationConfig::ColorSwap(config) => config.fade_duration,
            AnimationConfig::BouncyBall(config) => config.fade_duration,
        }
    }

    pub fn validate(&self, timeline: &PhaseTimeline) -> Result<()> {
        validate_fade(self.fade_duration(), timeline)?;
        match self {
            AnimationConfig::ColorSwap(_) => Ok(()),
            AnimationConfig::BouncyBall(config) => config.validate(),
        }
    }
}

#[derive(Debug, Clone)]
enum Animation {
    ColorSwap(ColorSwap),
    BouncyBall(BouncyBall),
}

/// Runs the configured animation against the current phase durations.
#[derive(Debug, Clone)]
pub struct AnimationEngine {
    animation: Animation,
    durations: [f64; PHASE_COUNT],
    max_diameter: f32,
    cue_enabled: bool,
}

impl Default for AnimationEngine {
    fn default() -> Self {
        Self {
            animation: Animation::ColorSwap(ColorSwap::new(ColorSwapConfig::default())),
            durations: PhaseTimeline::default().durations(),
            max_diameter: 0.0,
            cue_enabled: true,
        }
    }
}

impl AnimationEngine {
    pub fn new(config: AnimationConfig, timeline: &PhaseTimeline) -> Result<Self> {
        let mut engine = Self::default();
        engine.configure(config, timeline)?;
        Ok(engine)
    }

    /// Switches to `config`, or leaves the engine untouched if it is invalid
    /// for `timeline`.
    pub fn configure(&mut self, config: AnimationConfig, timeline: &PhaseTimeline) -> Result<()> {
        config.validate(timeline)?;
        self.animation = match config {
            AnimationConfig::ColorSwap(config) => Animation::ColorSwap(ColorSwap::new(config)),
            AnimationConfig::BouncyBall(config) => Animation::BouncyBall(BouncyBall::new(config)),
        };
        self.durations = timeline.durations();
        Ok(())
    }

    pub fn variant(&self) -> AnimationVariant {
        match self.animation {
            Animation::ColorSwap(_) => AnimationVariant::ColorSwap,
            Animation::BouncyBall(_) => AnimationVariant::BouncyBall,
        }
    }

    pub fn config(&self) -> AnimationConfig {
        match &self.animation {
            Animation::ColorSwap(animation) => AnimationConfig::ColorSwap(animation.config().clone()),
            Animation::BouncyBall(animation) => AnimationConfig::BouncyBall(animation.config().clone()),
        }
    }

    /// Updates the phase durations. Fails if the current fade window no
    /// longer fits.
    pub fn set_timeline(&mut self, timeline: &PhaseTimeline) -> Result<()> {
        validate_fade(self.config().fade_duration(), timeline)?;
        self.durations = timeline.durations();
        Ok(())
    }

    /// Bound supplied by the render surface; negative values count as zero.
    pub fn set_max_diameter(&mut self, max_diameter: f32) {
        self.max_diameter = max_diameter.max(0.0);
    }

    pub fn max_diameter(&self) -> f32 {
        self.max_diameter
    }

    pub fn set_cue_enabled(&mut self, enabled: bool) {
        self.cue_enabled = enabled;
    }

    pub fn cue_enabled(&self) -> bool {
        self.cue_enabled
    }

    /// Recolours the bouncy ball. The colour swap keeps its own colours.
    pub fn apply_palette(&mut self, palette: Palette) {
        if let Animation::BouncyBall(ball) = &mut self.animation {
            ball.apply_palette(palette);
        }
    }

    pub fn render(&self, phase_index: usize, elapsed_in_phase: f64) -> RenderState {
        let index = phase_index % PHASE_COUNT;
        let duration = self.durations[index];
        match &self.animation {
            Animation::ColorSwap(animation) => animation.render(index, elapsed_in_phase, duration),
            Animation::BouncyBall(animation) => {
                animation.render(index, elapsed_in_phase, duration, self.max_diameter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colours() {
        let color = Rgba::from_hex("#FF8000").unwrap();
        assert_eq!(color, Rgba::rgb(1.0, 128.0 / 255.0, 0.0));
        assert_eq!(Rgba::from_hex("00000080").unwrap().a, 128.0 / 255.0);
        assert!(Rgba::from_hex("#FFF").is_err());
        assert!(Rgba::from_hex("#GG0000").is_err());
    }

    #[test]
    fn lerp_hits_both_endpoints_exactly() {
        let a = Rgba::from_hex("#123456").unwrap();
        let b = Rgba::from_hex("#FEDCBA").unwrap();
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 7.0), b);
    }

    #[test]
    fn fade_factor_is_zero_before_window() {
        assert_eq!(fade_factor(3.4, 4.0, 0.5), 0.0);
        assert_eq!(fade_factor(3.5, 4.0, 0.5), 0.0);
        assert!((fade_factor(3.75, 4.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(fade_factor(4.0, 4.0, 0.5), 1.0);
        assert_eq!(fade_factor(3.99, 4.0, 0.0), 0.0);
    }

    #[test]
    fn stimuli_type_mapping() {
        assert_eq!(AnimationVariant::from_stimuli_type(0), AnimationVariant::ColorSwap);
        assert_eq!(AnimationVariant::from_stimuli_type(1), AnimationVariant::BouncyBall);
        assert_eq!(AnimationVariant::from_stimuli_type(2), AnimationVariant::BouncyBall);
        assert_eq!(AnimationVariant::from_stimuli_type(9), AnimationVariant::ColorSwap);
        for variant in [AnimationVariant::ColorSwap, AnimationVariant::BouncyBall] {
            assert_eq!(AnimationVariant::from_stimuli_type(variant.stimuli_type()), variant);
        }
    }

    #[test]
    fn fade_longer_than_shortest_active_phase_is_rejected() {
        let timeline = PhaseTimeline::from_durations([4.0, 0.4, 4.0, 4.0]).unwrap();
        let config = AnimationConfig::default_for(AnimationVariant::ColorSwap);
        assert!(config.validate(&timeline).is_err());

        let mut relaxed = timeline.clone();
        relaxed.phase_mut(1).active = false;
        assert!(config.validate(&relaxed).is_ok());
    }

    #[test]
    fn failed_configure_keeps_previous_animation() {
        let timeline = PhaseTimeline::default();
        let mut engine = AnimationEngine::default();
        let mut bad = BouncyBallConfig::default();
        bad.pulse_factor = 1.5;
        assert!(engine
            .configure(AnimationConfig::BouncyBall(bad), &timeline)
            .is_err());
        assert_eq!(engine.variant(), AnimationVariant::ColorSwap);
    }

    #[test]
    fn set_timeline_rejects_phase_shorter_than_fade() {
        let mut engine = AnimationEngine::default();
        let short = PhaseTimeline::from_durations([0.2, 4.0, 4.0, 4.0]).unwrap();
        assert!(engine.set_timeline(&short).is_err());
        let longer = PhaseTimeline::from_durations([8.0, 4.0, 4.0, 4.0]).unwrap();
        assert!(engine.set_timeline(&longer).is_ok());
    }
}
