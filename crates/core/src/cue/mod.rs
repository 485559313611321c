use crate::{CueSpec, PhaseTimeline, RenderSurface, Result};

/// Seam through which audio cues reach the audio backend. Requests are
/// fire-and-forget and never touch the binaural tone sources.
pub trait SampleRequester {
    fn request_sample(&mut self, sample_id: &str) -> Result<()>;
}

/// What the dispatcher did for a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueOutcome {
    /// The phase has no cue, or cues are disabled.
    Silent,
    Overlay(String),
    Sample(String),
}

/// Where a dispatched cue may be presented.
pub struct CueTargets<'a> {
    pub surface: &'a mut dyn RenderSurface,
    pub samples: &'a mut dyn SampleRequester,
    /// Text overlays are only drawn while the visual channel is on.
    pub visual_enabled: bool,
}

/// Turns phase transitions into overlays or sample requests.
#[derive(Debug, Default)]
pub struct CueDispatcher {
    overlay_phase: Option<usize>,
}

impl CueDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase whose text overlay is currently shown.
    pub fn overlay_phase(&self) -> Option<usize> {
        self.overlay_phase
    }

    /// Announces `phase`. Call once per transition, before the frame of the
    /// new phase is rendered. Any overlay from the previous phase is removed
    /// first; errors leave only this phase's cue skipped.
    pub fn dispatch(
        &mut self,
        phase: usize,
        timeline: &PhaseTimeline,
        cue_enabled: bool,
        targets: CueTargets<'_>,
    ) -> Result<CueOutcome> {
        if self.overlay_phase.take().is_some() {
            targets.surface.clear_overlay()?;
        }
        if !cue_enabled {
            return Ok(CueOutcome::Silent);
        }

        match &timeline.phase(phase).cue {
            CueSpec::None => Ok(CueOutcome::Silent),
            CueSpec::Text(_) if !targets.visual_enabled => Ok(CueOutcome::Silent),
            CueSpec::Text(text) => {
                targets.surface.overlay_cue(text)?;
                self.overlay_phase = Some(phase);
                tracing::debug!(phase, label = %text.label, "text cue shown");
                Ok(CueOutcome::Overlay(text.label.clone()))
            }
            CueSpec::Audio { sample_id } => {
                targets.samples.request_sample(sample_id)?;
                tracing::debug!(phase, sample_id = %sample_id, "audio cue requested");
                Ok(CueOutcome::Sample(sample_id.clone()))
            }
        }
    }

    /// Clears the overlay once the position has moved to another phase, even
    /// when that phase is inactive and never announced.
    pub fn retire(&mut self, current_phase: usize, surface: &mut dyn RenderSurface) -> Result<()> {
        match self.overlay_phase {
            Some(phase) if phase != current_phase => self.reset(surface),
            _ => Ok(()),
        }
    }

    /// Removes any overlay left on the surface. Used when a session ends.
    pub fn reset(&mut self, surface: &mut dyn RenderSurface) -> Result<()> {
        if self.overlay_phase.take().is_some() {
            surface.clear_overlay()?;
        }
        Ok(())
    }
}
