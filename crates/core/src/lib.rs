//! Core library for the Elevate stimulus induction engine.
//!
//! A session runs a repeating four-phase breathing cycle and drives two
//! synchronised stimulus channels from it: a binaural beat on the audio side
//! and a phase-driven animation on the visual side, with optional cues at
//! each phase boundary. [`InductionController`] owns the whole thing; the
//! other modules are the subsystems it coordinates.

pub mod analysis;
pub mod animation;
pub mod audio;
pub mod config;
pub mod controller;
pub mod cue;
pub mod error;
pub mod render;
pub mod timeline;

pub use analysis::{compute_rms, BinauralReading, SpectrumProbe};
pub use animation::{
    fade_factor, phase_crossfade, AnimationConfig, AnimationEngine, AnimationVariant, BouncyBall,
    BouncyBallConfig, ColorSwap, ColorSwapConfig, Easing, Rgba,
};
pub use audio::{
    AudioEngine, AudioSink, ParamCell, SoftwareSink, ToneHandle, ToneRenderer, DEFAULT_SAMPLE_RATE,
};
pub use config::{
    AudioParameters, BeatBand, BrainwaveState, FrequencyLimits, MemorySettings, Palette,
    PersistedSettings, SessionConfig, SettingsProvider,
};
pub use controller::{
    InductionController, InductionEvent, InductionHandle, InductionSession, SessionStatus,
};
pub use cue::{CueDispatcher, CueOutcome, CueTargets, SampleRequester};
pub use error::{ErrorKind, InductionError, Result};
pub use render::{FrameCallback, FrameSource, Geometry, RenderState, RenderSurface};
pub use timeline::{
    CuePosition, CueSpec, FrameClock, PhasePosition, PhaseScheduler, PhaseSpec, PhaseTick,
    PhaseTimeline, SchedulerState, TextCue, DEFAULT_MAX_FRAME_DELTA, PHASE_COUNT,
};
