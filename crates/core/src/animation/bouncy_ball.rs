use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::{phase_crossfade, Rgba};
use crate::{
    BrainwaveState, Geometry, InductionError, Palette, RenderState, Result, PHASE_COUNT,
};

/// Progression curve for the inhale and exhale phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    /// Smoothstep: slow start and end, still monotonic.
    EaseInOut,
}

impl Easing {
    pub fn apply(self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Easing::Linear => p,
            Easing::EaseInOut => p * p * (3.0 - 2.0 * p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BouncyBallConfig {
    pub breath_color: Rgba,
    pub hold_color: Rgba,
    pub background: Rgba,
    /// Fraction of the maximum diameter the holds pulse across.
    pub pulse_factor: f64,
    pub fade_duration: f64,
    /// Seconds per pulse during the hold phases.
    pub pulse_period: f64,
    pub easing: Easing,
}

impl Default for BouncyBallConfig {
    fn default() -> Self {
        let palette = BrainwaveState::Theta.palette();
        Self {
            breath_color: palette.breath,
            hold_color: palette.hold,
            background: palette.background,
            pulse_factor: 0.05,
            fade_duration: 0.5,
            pulse_period: 1.0,
            easing: Easing::Linear,
        }
    }
}

impl BouncyBallConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pulse_factor > 0.0 && self.pulse_factor < 1.0) {
            return Err(InductionError::config(format!(
                "pulse factor {} must lie strictly between 0 and 1",
                self.pulse_factor
            )));
        }
        if !self.pulse_period.is_finite() || self.pulse_period <= 0.0 {
            return Err(InductionError::config(format!(
                "pulse period {} must be a positive number of seconds",
                self.pulse_period
            )));
        }
        Ok(())
    }

    /// Takes the breath, hold and background colours from `palette`.
    pub fn apply_palette(&mut self, palette: Palette) {
        self.breath_color = palette.breath;
        self.hold_color = palette.hold;
        self.background = palette.background;
    }
}

/// Breathing guide: a ball that grows on inhale, pulses near full size on the
/// first hold, shrinks on exhale and pulses near zero on the second hold.
#[derive(Debug, Clone)]
pub struct BouncyBall {
    config: BouncyBallConfig,
}

impl BouncyBall {
    pub fn new(config: BouncyBallConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BouncyBallConfig {
        &self.config
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        self.config.apply_palette(palette);
    }

    pub fn render(
        &self,
        phase_index: usize,
        elapsed: f64,
        duration: f64,
        max_diameter: f32,
    ) -> RenderState {
        let colors = [
            self.config.breath_color,
            self.config.hold_color,
            self.config.breath_color,
            self.config.hold_color,
        ];
        RenderState {
            color: phase_crossfade(&colors, phase_index, elapsed, duration, self.config.fade_duration),
            background: Some(self.config.background),
            geometry: Some(Geometry {
                diameter: self.diameter(phase_index, elapsed, duration, max_diameter),
            }),
        }
    }

    pub fn diameter(&self, phase_index: usize, elapsed: f64, duration: f64, max_diameter: f32) -> f32 {
        let max = f64::from(max_diameter.max(0.0));
        let pulse_edge = max * self.config.pulse_factor;
        let progress = if duration > 0.0 { elapsed / duration } else { 1.0 };
        // Cosine wave in [0, 1] that starts at 1.
        let wave = 0.5 * (1.0 + (TAU * elapsed / self.config.pulse_period).cos());

        let diameter = match phase_index % PHASE_COUNT {
            0 => max * self.config.easing.apply(progress),
            1 => pulse_edge + (max - pulse_edge) * wave,
            2 => max * (1.0 - self.config.easing.apply(progress)),
            _ => pulse_edge * (1.0 - wave),
        };
        diameter.clamp(0.0, max) as f32
    }
}
