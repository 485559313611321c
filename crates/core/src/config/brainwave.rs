use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{InductionError, Rgba};

/// Target brainwave band of a session. Each band suggests a beat frequency
/// (the channel offset) and a colour scheme for the bouncy ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainwaveState {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

/// Beat frequency range, in Hz, associated with a brainwave band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatBand {
    pub lower: f64,
    pub upper: f64,
    pub default: f64,
}

impl BeatBand {
    pub fn contains(&self, hz: f64) -> bool {
        (self.lower..=self.upper).contains(&hz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub breath: Rgba,
    pub hold: Rgba,
    pub background: Rgba,
}

impl BrainwaveState {
    pub const ALL: [BrainwaveState; 5] = [
        BrainwaveState::Delta,
        BrainwaveState::Theta,
        BrainwaveState::Alpha,
        BrainwaveState::Beta,
        BrainwaveState::Gamma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BrainwaveState::Delta => "delta",
            BrainwaveState::Theta => "theta",
            BrainwaveState::Alpha => "alpha",
            BrainwaveState::Beta => "beta",
            BrainwaveState::Gamma => "gamma",
        }
    }

    /// Maps the persisted `intended_state` index onto a band.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn band(self) -> BeatBand {
        let (lower, upper, default) = match self {
            BrainwaveState::Delta => (0.3, 4.0, 2.0),
            BrainwaveState::Theta => (4.1, 8.0, 6.0),
            BrainwaveState::Alpha => (8.1, 13.0, 10.0),
            BrainwaveState::Beta => (13.1, 30.0, 20.0),
            BrainwaveState::Gamma => (30.0, 130.0, 40.0),
        };
        BeatBand {
            lower,
            upper,
            default,
        }
    }

    pub fn palette(self) -> Palette {
        let [breath, hold, background] = match self {
            BrainwaveState::Delta => [(0.1, 0.1, 0.4), (0.2, 0.0, 0.3), (0.05, 0.05, 0.2)],
            BrainwaveState::Theta => [(0.2, 0.6, 0.9), (0.6, 0.4, 0.8), (0.2, 0.2, 0.6)],
            BrainwaveState::Alpha => [(0.4, 0.8, 0.5), (0.6, 0.8, 0.2), (0.2, 0.5, 0.3)],
            BrainwaveState::Beta => [(0.9, 0.3, 0.2), (0.8, 0.5, 0.1), (0.6, 0.2, 0.1)],
            BrainwaveState::Gamma => [(0.9, 0.8, 0.2), (0.9, 0.7, 0.0), (0.7, 0.6, 0.1)],
        };
        Palette {
            breath: Rgba::rgb(breath.0, breath.1, breath.2),
            hold: Rgba::rgb(hold.0, hold.1, hold.2),
            background: Rgba::rgb(background.0, background.1, background.2),
        }
    }
}

impl fmt::Display for BrainwaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrainwaveState {
    type Err = InductionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.name() == key)
            .ok_or_else(|| InductionError::config(format!("unknown brainwave state `{s}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("  Theta ".parse::<BrainwaveState>().unwrap(), BrainwaveState::Theta);
        assert_eq!("GAMMA".parse::<BrainwaveState>().unwrap(), BrainwaveState::Gamma);
        assert!("kappa".parse::<BrainwaveState>().is_err());
    }

    #[test]
    fn band_defaults_sit_inside_their_band() {
        for state in BrainwaveState::ALL {
            let band = state.band();
            assert!(band.contains(band.default), "{state}");
        }
    }

    #[test]
    fn index_mapping_follows_declaration_order() {
        assert_eq!(BrainwaveState::from_index(0), Some(BrainwaveState::Delta));
        assert_eq!(BrainwaveState::from_index(4), Some(BrainwaveState::Gamma));
        assert_eq!(BrainwaveState::from_index(5), None);
        assert_eq!(BrainwaveState::from_index(-1), None);
    }
}
