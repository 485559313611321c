use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::{InductionController, InductionEvent, SessionStatus};
use crate::{
    AnimationConfig, AnimationVariant, BrainwaveState, FrameCallback, FrameSource, RenderState,
    Result, SessionConfig, PHASE_COUNT,
};

/// Cloneable, thread-safe front end to an [`InductionController`].
///
/// UI threads issue commands through the handle while the render loop drives
/// frames through [`frame_callback`](Self::frame_callback).
#[derive(Clone)]
pub struct InductionHandle {
    inner: Arc<Mutex<InductionController>>,
}

impl InductionHandle {
    pub fn new(controller: InductionController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Runs `f` with exclusive access to the controller.
    pub fn with<R>(&self, f: impl FnOnce(&mut InductionController) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn start_induction(&self, config: SessionConfig) -> Result<()> {
        self.lock().start_induction(config)
    }

    pub fn pause_induction(&self) {
        self.lock().pause_induction();
    }

    pub fn resume_induction(&self) {
        self.lock().resume_induction();
    }

    pub fn stop_induction(&self) {
        self.lock().stop_induction();
    }

    pub fn tick(&self, delta_seconds: f64) -> Option<RenderState> {
        self.lock().tick(delta_seconds)
    }

    pub fn set_base_frequency(&self, hz: f64) -> Result<()> {
        self.lock().set_base_frequency(hz)
    }

    pub fn set_channel_offset(&self, hz: f64) -> Result<()> {
        self.lock().set_channel_offset(hz)
    }

    pub fn set_volume(&self, volume: f32) {
        self.lock().set_volume(volume);
    }

    pub fn set_visual_enabled(&self, enabled: bool) {
        self.lock().set_visual_enabled(enabled);
    }

    pub fn set_cues_enabled(&self, enabled: bool) {
        self.lock().set_cues_enabled(enabled);
    }

    pub fn set_animation_variant(
        &self,
        variant: AnimationVariant,
        config: AnimationConfig,
    ) -> Result<()> {
        self.lock().set_animation_variant(variant, config)
    }

    pub fn set_phase_durations(&self, durations: [f64; PHASE_COUNT]) -> Result<()> {
        self.lock().set_phase_durations(durations)
    }

    pub fn apply_brainwave_state(&self, state: BrainwaveState) -> Result<()> {
        self.lock().apply_brainwave_state(state)
    }

    pub fn current_status(&self) -> SessionStatus {
        self.lock().current_status()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.lock().elapsed_seconds()
    }

    pub fn config(&self) -> SessionConfig {
        self.lock().config().clone()
    }

    pub fn drain_events(&self) -> Vec<InductionEvent> {
        self.lock().drain_events()
    }

    /// Frame callback bound to the session running right now.
    ///
    /// The callback holds only a weak reference, and it goes inert once that
    /// session is stopped or replaced, or the controller is dropped.
    pub fn frame_callback(&self) -> FrameCallback {
        let weak: Weak<Mutex<InductionController>> = Arc::downgrade(&self.inner);
        let generation = self.lock().generation();
        Box::new(move |delta_seconds| {
            let inner = weak.upgrade()?;
            let mut controller = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if controller.generation() != generation {
                return None;
            }
            controller.tick(delta_seconds)
        })
    }

    /// Registers a fresh [`frame_callback`](Self::frame_callback) with the
    /// render loop.
    pub fn bind(&self, source: &mut dyn FrameSource) {
        source.register_frame_callback(self.frame_callback());
    }

    // A panic while holding the lock must not leave the session unstoppable.
    fn lock(&self) -> MutexGuard<'_, InductionController> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for InductionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InductionHandle")
            .field("strong", &Arc::strong_count(&self.inner))
            .finish()
    }
}
