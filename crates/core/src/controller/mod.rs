//! Session lifecycle and live parameter control.
//!
//! [`InductionController`] owns every subsystem of one session: the phase
//! scheduler, the binaural audio engine, the animation engine, the cue
//! dispatcher and the render surface. It is driven by [`tick`] from the
//! render loop. [`InductionHandle`] wraps it for use across threads.
//!
//! [`tick`]: InductionController::tick

use std::collections::VecDeque;

use crate::{
    animation::{AnimationConfig, AnimationEngine, AnimationVariant},
    audio::{AudioEngine, AudioSink},
    config::{BrainwaveState, SessionConfig, SettingsProvider},
    cue::{CueDispatcher, CueOutcome, CueTargets},
    InductionError, PhaseScheduler, RenderState, RenderSurface, Result, PHASE_COUNT,
};

mod handle;

pub use handle::InductionHandle;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Playing,
    Paused,
    /// Passed through by `stop_induction` before settling in `Idle`; only
    /// visible in the event stream.
    Stopped,
}

/// Things worth telling the outside world about, drained with
/// [`InductionController::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum InductionEvent {
    StatusChanged(SessionStatus),
    PhaseEntered(usize),
    CueSkipped { phase: usize, reason: String },
    AudioDegraded(String),
    FrameDropped(String),
}

/// The configuration and status of the one session a controller runs.
#[derive(Debug, Clone, PartialEq)]
pub struct InductionSession {
    pub config: SessionConfig,
    pub status: SessionStatus,
}

pub struct InductionController {
    session: InductionSession,
    scheduler: PhaseScheduler,
    audio: AudioEngine,
    animation: AnimationEngine,
    cues: CueDispatcher,
    surface: Box<dyn RenderSurface>,
    events: VecDeque<InductionEvent>,
    generation: u64,
}

impl InductionController {
    /// Creates an idle controller with the default session configuration.
    pub fn new(audio_sink: Box<dyn AudioSink>, surface: Box<dyn RenderSurface>) -> Self {
        Self {
            session: InductionSession {
                config: SessionConfig::default(),
                status: SessionStatus::Idle,
            },
            scheduler: PhaseScheduler::new(),
            audio: AudioEngine::new(audio_sink),
            animation: AnimationEngine::default(),
            cues: CueDispatcher::new(),
            surface,
            events: VecDeque::with_capacity(EVENT_CAPACITY),
            generation: 0,
        }
    }

    /// Creates an idle controller whose pending configuration comes from a
    /// settings store.
    pub fn from_settings(
        settings: &dyn SettingsProvider,
        audio_sink: Box<dyn AudioSink>,
        surface: Box<dyn RenderSurface>,
    ) -> Result<Self> {
        let config = settings.get_defaults()?;
        config.validate()?;
        let mut controller = Self::new(audio_sink, surface);
        controller.install_idle_config(config)?;
        Ok(controller)
    }

    pub fn current_status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn session(&self) -> &InductionSession {
        &self.session
    }

    /// Configuration of the running session, or the one the next
    /// [`start_pending`](Self::start_pending) will use.
    pub fn config(&self) -> &SessionConfig {
        &self.session.config
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    /// Seconds of stimulus delivered since the session started, pauses
    /// excluded.
    pub fn elapsed_seconds(&self) -> f64 {
        self.scheduler.total_elapsed()
    }

    /// Bumped whenever a session starts or stops. Frame callbacks compare it
    /// to tell whether they still belong to the live session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Validates `config` in full and, only if it is valid, replaces any
    /// running session with it.
    pub fn start_induction(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        if self.is_active() {
            self.stop_induction();
        }

        self.audio
            .configure(config.limits, config.audio.base_frequency, config.audio.channel_offset)?;
        self.audio.set_volume(config.volume);
        self.animation.configure(config.animation.clone(), &config.timeline)?;
        self.animation.set_cue_enabled(config.cues_enabled);
        self.animation.set_max_diameter(self.surface.max_diameter());
        self.scheduler.start(config.timeline.clone())?;

        if config.audio.playing && self.audio.start().is_err() {
            self.collect_audio_fault();
        }

        self.session.config = config;
        self.generation = self.generation.wrapping_add(1);
        self.set_status(SessionStatus::Playing);
        tracing::info!(
            variant = ?self.animation.variant(),
            left_hz = self.audio.frequencies().0,
            right_hz = self.audio.frequencies().1,
            "induction started"
        );
        Ok(())
    }

    /// Starts a session from the pending configuration.
    pub fn start_pending(&mut self) -> Result<()> {
        self.start_induction(self.session.config.clone())
    }

    pub fn pause_induction(&mut self) {
        if self.session.status != SessionStatus::Playing {
            return;
        }
        self.scheduler.pause();
        self.audio.pause();
        self.collect_audio_fault();
        self.set_status(SessionStatus::Paused);
    }

    pub fn resume_induction(&mut self) {
        if self.session.status != SessionStatus::Paused {
            return;
        }
        self.scheduler.resume();
        self.audio.resume();
        self.collect_audio_fault();
        self.set_status(SessionStatus::Playing);
    }

    /// Ends the session from any state and returns to `Idle`. Frame callbacks
    /// handed out for the ended session go inert.
    pub fn stop_induction(&mut self) {
        self.scheduler.stop();
        self.audio.stop();
        self.collect_audio_fault();
        if let Err(err) = self.cues.reset(self.surface.as_mut()) {
            tracing::warn!(error = %err, "failed to clear cue overlay");
        }
        self.generation = self.generation.wrapping_add(1);
        if self.session.status != SessionStatus::Idle {
            self.set_status(SessionStatus::Stopped);
            tracing::info!("induction stopped");
        }
        self.session.status = SessionStatus::Idle;
    }

    /// Advances the session by one frame and presents the result. Returns
    /// `None` unless the session is playing.
    pub fn tick(&mut self, delta_seconds: f64) -> Option<RenderState> {
        if self.session.status != SessionStatus::Playing {
            return None;
        }

        let tick = self.scheduler.advance(delta_seconds);
        let visual_enabled = self.session.config.enable_visual_stimuli;

        if let Err(err) = self.cues.retire(tick.position.index, self.surface.as_mut()) {
            tracing::warn!(error = %err, "failed to clear cue overlay");
        }

        if let Some(phase) = tick.entered {
            self.push_event(InductionEvent::PhaseEntered(phase));
            let targets = CueTargets {
                surface: self.surface.as_mut(),
                samples: &mut self.audio,
                visual_enabled,
            };
            match self.cues.dispatch(
                phase,
                self.scheduler.timeline(),
                self.animation.cue_enabled(),
                targets,
            ) {
                Ok(CueOutcome::Silent) => {}
                Ok(outcome) => tracing::trace!(phase, ?outcome, "cue dispatched"),
                Err(err) => {
                    tracing::warn!(phase, error = %err, "cue skipped");
                    self.push_event(InductionEvent::CueSkipped {
                        phase,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let state = if visual_enabled {
            self.animation.set_max_diameter(self.surface.max_diameter());
            self.animation.render(tick.position.index, tick.position.elapsed)
        } else {
            RenderState::blank()
        };

        if let Err(err) = self.surface.present(&state) {
            tracing::warn!(error = %err, "frame dropped");
            self.push_event(InductionEvent::FrameDropped(err.to_string()));
        }
        self.collect_audio_fault();
        Some(state)
    }

    pub fn set_base_frequency(&mut self, hz: f64) -> Result<()> {
        self.audio.set_base_frequency(hz)?;
        self.session.config.audio.base_frequency = hz;
        self.collect_audio_fault();
        Ok(())
    }

    pub fn set_channel_offset(&mut self, hz: f64) -> Result<()> {
        self.audio.set_channel_offset(hz)?;
        self.session.config.audio.channel_offset = hz;
        self.collect_audio_fault();
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
        self.session.config.volume = self.audio.volume();
        self.collect_audio_fault();
    }

    /// Turning the visual channel off also removes any text cue on screen.
    pub fn set_visual_enabled(&mut self, enabled: bool) {
        self.session.config.enable_visual_stimuli = enabled;
        if !enabled {
            if let Err(err) = self.cues.reset(self.surface.as_mut()) {
                tracing::warn!(error = %err, "failed to clear cue overlay");
            }
        }
    }

    pub fn set_cues_enabled(&mut self, enabled: bool) {
        self.session.config.cues_enabled = enabled;
        self.animation.set_cue_enabled(enabled);
        if !enabled {
            if let Err(err) = self.cues.reset(self.surface.as_mut()) {
                tracing::warn!(error = %err, "failed to clear cue overlay");
            }
        }
    }

    /// Switches the animation. `config` must belong to `variant` and fit the
    /// current phase durations.
    pub fn set_animation_variant(
        &mut self,
        variant: AnimationVariant,
        config: AnimationConfig,
    ) -> Result<()> {
        if config.variant() != variant {
            return Err(InductionError::config(format!(
                "{:?} config supplied for the {variant:?} variant",
                config.variant()
            )));
        }
        config.validate(&self.session.config.timeline)?;
        if self.is_active() {
            self.animation
                .configure(config.clone(), &self.session.config.timeline)?;
        }
        self.session.config.animation = config;
        self.session.config.stimuli_type = variant.stimuli_type();
        Ok(())
    }

    pub fn set_phase_durations(&mut self, durations: [f64; PHASE_COUNT]) -> Result<()> {
        let timeline = self.session.config.timeline.with_durations(durations)?;
        self.session.config.animation.validate(&timeline)?;
        if self.is_active() {
            self.animation.set_timeline(&timeline)?;
            self.scheduler.set_timeline(timeline.clone())?;
        }
        self.session.config.timeline = timeline;
        Ok(())
    }

    /// Tunes the beat to the band's default frequency and, for the bouncy
    /// ball, switches to the band's colours.
    pub fn apply_brainwave_state(&mut self, state: BrainwaveState) -> Result<()> {
        self.set_channel_offset(state.band().default)?;
        self.session.config.apply_brainwave_state(state);
        if self.is_active() {
            self.animation.apply_palette(state.palette());
        }
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<InductionEvent> {
        self.events.drain(..).collect()
    }

    fn is_active(&self) -> bool {
        matches!(
            self.session.status,
            SessionStatus::Playing | SessionStatus::Paused
        )
    }

    fn install_idle_config(&mut self, config: SessionConfig) -> Result<()> {
        self.audio
            .configure(config.limits, config.audio.base_frequency, config.audio.channel_offset)?;
        self.audio.set_volume(config.volume);
        self.animation.configure(config.animation.clone(), &config.timeline)?;
        self.animation.set_cue_enabled(config.cues_enabled);
        self.session.config = config;
        Ok(())
    }

    fn collect_audio_fault(&mut self) {
        if let Some(fault) = self.audio.take_fault() {
            self.push_event(InductionEvent::AudioDegraded(fault));
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.session.status = status;
        self.push_event(InductionEvent::StatusChanged(status));
    }

    fn push_event(&mut self, event: InductionEvent) {
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl std::fmt::Debug for InductionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InductionController")
            .field("session", &self.session)
            .field("scheduler", &self.scheduler)
            .field("audio", &self.audio)
            .field("animation", &self.animation)
            .field("events", &self.events.len())
            .field("generation", &self.generation)
            .finish()
    }
}
