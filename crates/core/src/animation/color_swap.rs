use serde::{Deserialize, Serialize};

use super::{phase_crossfade, Rgba};
use crate::{RenderState, PHASE_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSwapConfig {
    pub phase_colors: [Rgba; PHASE_COUNT],
    pub fade_duration: f64,
}

impl Default for ColorSwapConfig {
    fn default() -> Self {
        Self {
            phase_colors: [
                Rgba::rgb(0.2, 0.6, 0.9),
                Rgba::rgb(0.6, 0.4, 0.8),
                Rgba::rgb(0.2, 0.2, 0.6),
                Rgba::rgb(0.1, 0.1, 0.4),
            ],
            fade_duration: 0.5,
        }
    }
}

/// Fills the surface with one colour per phase, fading into the next
/// phase's colour over the last `fade_duration` seconds of each phase.
#[derive(Debug, Clone)]
pub struct ColorSwap {
    config: ColorSwapConfig,
}

impl ColorSwap {
    pub fn new(config: ColorSwapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ColorSwapConfig {
        &self.config
    }

    pub fn render(&self, phase_index: usize, elapsed: f64, duration: f64) -> RenderState {
        RenderState {
            color: phase_crossfade(
                &self.config.phase_colors,
                phase_index,
                elapsed,
                duration,
                self.config.fade_duration,
            ),
            background: None,
            geometry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_ramp() -> ColorSwap {
        let hex = ["#FFFFFF", "#EEEEEE", "#DDDDDD", "#CCCCCC"];
        ColorSwap::new(ColorSwapConfig {
            phase_colors: hex.map(|h| Rgba::from_hex(h).unwrap()),
            fade_duration: 0.5,
        })
    }

    #[test]
    fn holds_phase_colour_before_fade_window() {
        let swap = grey_ramp();
        assert_eq!(swap.render(0, 3.4, 4.0).color, Rgba::from_hex("#FFFFFF").unwrap());
    }

    #[test]
    fn fade_midpoint_is_halfway_between_colours() {
        let swap = grey_ramp();
        let color = swap.render(0, 3.75, 4.0).color;
        let expected = (1.0 + 238.0 / 255.0) / 2.0;
        assert!((color.r - expected).abs() < 1e-6);
        assert!((color.g - expected).abs() < 1e-6);
        assert!((color.b - expected).abs() < 1e-6);
    }

    #[test]
    fn boundary_matches_next_phase_exactly() {
        let swap = grey_ramp();
        let next = Rgba::from_hex("#EEEEEE").unwrap();
        assert_eq!(swap.render(0, 4.0, 4.0).color, next);
        assert_eq!(swap.render(1, 0.0, 4.0).color, next);
    }

    #[test]
    fn last_phase_fades_back_to_first() {
        let swap = grey_ramp();
        assert_eq!(swap.render(3, 4.0, 4.0).color, Rgba::from_hex("#FFFFFF").unwrap());
    }
}
