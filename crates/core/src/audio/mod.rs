use crate::{
    cue::SampleRequester, AudioParameters, FrequencyLimits, InductionError, Result,
};

mod graph;

pub use graph::{ParamCell, SoftwareSink, ToneRenderer, DEFAULT_SAMPLE_RATE};

/// Opaque reference to a dual tone source created by an [`AudioSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToneHandle(pub(crate) u64);

/// Audio backend the engine drives. Calls must return promptly; the backend
/// applies frequency changes on its own processing thread.
pub trait AudioSink: Send {
    fn create_dual_tone_source(&mut self, left_hz: f64, right_hz: f64) -> Result<ToneHandle>;
    fn update_frequencies(&mut self, handle: ToneHandle, left_hz: f64, right_hz: f64) -> Result<()>;
    fn set_volume(&mut self, handle: ToneHandle, volume: f32) -> Result<()>;
    /// Queues a one-shot sample. Must not block or interrupt the tones.
    fn play_sample(&mut self, sample_id: &str) -> Result<()>;
    fn start(&mut self, handle: ToneHandle) -> Result<()>;
    fn stop(&mut self, handle: ToneHandle) -> Result<()>;
    fn mute(&mut self, handle: ToneHandle, muted: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackState {
    Stopped,
    Playing,
    Muted,
}

/// Binaural beat generator: a left tone at the base frequency and a right
/// tone at base plus offset, on a graph owned by the [`AudioSink`].
pub struct AudioEngine {
    sink: Box<dyn AudioSink>,
    limits: FrequencyLimits,
    base_frequency: f64,
    channel_offset: f64,
    volume: f32,
    handle: Option<ToneHandle>,
    state: PlaybackState,
    fault: Option<String>,
}

impl AudioEngine {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        let defaults = AudioParameters::default();
        Self {
            sink,
            limits: FrequencyLimits::default(),
            base_frequency: defaults.base_frequency,
            channel_offset: defaults.channel_offset,
            volume: crate::config::DEFAULT_VOLUME,
            handle: None,
            state: PlaybackState::Stopped,
            fault: None,
        }
    }

    pub fn parameters(&self) -> AudioParameters {
        AudioParameters {
            base_frequency: self.base_frequency,
            channel_offset: self.channel_offset,
            playing: self.state == PlaybackState::Playing,
        }
    }

    pub fn limits(&self) -> &FrequencyLimits {
        &self.limits
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Left and right tone frequencies as sent to the graph, clamped into
    /// the audible range.
    pub fn frequencies(&self) -> (f64, f64) {
        let parameters = self.parameters();
        (
            self.limits.clamp_audible(parameters.left_frequency()),
            self.limits.clamp_audible(parameters.right_frequency()),
        )
    }

    /// Installs new limits together with parameters that satisfy them.
    pub fn configure(&mut self, limits: FrequencyLimits, base_hz: f64, offset_hz: f64) -> Result<()> {
        limits.validate()?;
        limits.check_base(base_hz)?;
        limits.check_offset(offset_hz)?;
        self.limits = limits;
        self.base_frequency = base_hz;
        self.channel_offset = offset_hz;
        self.push_frequencies();
        Ok(())
    }

    pub fn set_base_frequency(&mut self, hz: f64) -> Result<()> {
        self.limits.check_base(hz)?;
        self.base_frequency = hz;
        self.push_frequencies();
        Ok(())
    }

    pub fn set_channel_offset(&mut self, hz: f64) -> Result<()> {
        self.limits.check_offset(hz)?;
        self.channel_offset = hz;
        self.push_frequencies();
        Ok(())
    }

    /// Sets the output level, clamped into `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        if let Some(handle) = self.live_handle() {
            if let Err(err) = self.sink.set_volume(handle, self.volume) {
                self.degrade(err);
            }
        }
    }

    /// Builds the graph on first use and starts it. A backend failure leaves
    /// the engine stopped and silent; calling `start` again retries.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Muted => {
                self.resume();
                return Ok(());
            }
            PlaybackState::Stopped => {}
        }

        let (left, right) = self.frequencies();
        match self.activate(left, right) {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                self.fault = None;
                tracing::info!(left_hz = left, right_hz = right, "binaural tones started");
                Ok(())
            }
            Err(err) => Err(self.degrade(err)),
        }
    }

    /// Deactivates the graph but keeps it for a cheap restart.
    pub fn stop(&mut self) {
        if let Some(handle) = self.live_handle() {
            if let Err(err) = self.sink.stop(handle) {
                self.degrade(err);
            }
        }
        self.state = PlaybackState::Stopped;
    }

    /// Mutes the output; the graph keeps running.
    pub fn pause(&mut self) {
        if let (Some(handle), PlaybackState::Playing) = (self.handle, self.state) {
            match self.sink.mute(handle, true) {
                Ok(()) => self.state = PlaybackState::Muted,
                Err(err) => {
                    self.degrade(err);
                }
            }
        }
    }

    pub fn resume(&mut self) {
        if let (Some(handle), PlaybackState::Muted) = (self.handle, self.state) {
            match self.sink.mute(handle, false) {
                Ok(()) => self.state = PlaybackState::Playing,
                Err(err) => {
                    self.degrade(err);
                }
            }
        }
    }

    /// Returns and clears the last backend failure, if any.
    pub fn take_fault(&mut self) -> Option<String> {
        self.fault.take()
    }

    fn activate(&mut self, left: f64, right: f64) -> Result<()> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = self.sink.create_dual_tone_source(left, right)?;
                self.handle = Some(handle);
                handle
            }
        };
        self.sink.update_frequencies(handle, left, right)?;
        self.sink.set_volume(handle, self.volume)?;
        self.sink.start(handle)
    }

    fn live_handle(&self) -> Option<ToneHandle> {
        match self.state {
            PlaybackState::Stopped => None,
            _ => self.handle,
        }
    }

    fn push_frequencies(&mut self) {
        let Some(handle) = self.live_handle() else {
            return;
        };
        let (left, right) = self.frequencies();
        match self.sink.update_frequencies(handle, left, right) {
            Ok(()) => tracing::debug!(left_hz = left, right_hz = right, "frequencies updated"),
            Err(err) => {
                self.degrade(err);
            }
        }
    }

    /// Records a backend failure and silences the engine.
    fn degrade(&mut self, err: InductionError) -> InductionError {
        let err = match err {
            err @ InductionError::AudioBackend(_) => err,
            other => InductionError::audio(other.to_string()),
        };
        tracing::warn!(error = %err, "audio degraded to silence");
        if let Some(handle) = self.handle {
            let _ = self.sink.mute(handle, true);
        }
        self.state = PlaybackState::Stopped;
        self.fault = Some(err.to_string());
        err
    }
}

impl SampleRequester for AudioEngine {
    fn request_sample(&mut self, sample_id: &str) -> Result<()> {
        match self.sink.play_sample(sample_id) {
            Ok(()) => Ok(()),
            Err(err @ InductionError::CueResourceMissing(_)) => Err(err),
            Err(err) => Err(InductionError::audio(err.to_string())),
        }
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("base_frequency", &self.base_frequency)
            .field("channel_offset", &self.channel_offset)
            .field("volume", &self.volume)
            .field("state", &self.state)
            .field("fault", &self.fault)
            .finish()
    }
}
