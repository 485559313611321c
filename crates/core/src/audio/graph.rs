//! In-process binaural graph.
//!
//! [`SoftwareSink`] is the control side handed to the [`AudioEngine`](super::AudioEngine);
//! [`ToneRenderer`] is the processing side owned by the device callback.
//! They share only atomic parameter cells and a bounded request channel, so
//! neither side ever waits on the other.

use std::{
    collections::HashMap,
    f64::consts::TAU,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::{AudioSink, ToneHandle};
use crate::{InductionError, Result};

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

const SAMPLE_QUEUE_DEPTH: usize = 8;
const MAX_SAMPLE_VOICES: usize = 8;

/// Lock-free `f64` shared between the control thread and the audio callback.
#[derive(Debug, Default)]
pub struct ParamCell(AtomicU64);

impl ParamCell {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

#[derive(Debug)]
struct GraphShared {
    left_hz: ParamCell,
    right_hz: ParamCell,
    volume: ParamCell,
    running: AtomicBool,
    muted: AtomicBool,
}

/// Control side of the software graph.
pub struct SoftwareSink {
    shared: Arc<GraphShared>,
    samples: HashMap<String, Arc<[f32]>>,
    requests: Sender<Arc<[f32]>>,
    renderer: Option<ToneRenderer>,
    handle: Option<ToneHandle>,
}

impl SoftwareSink {
    pub fn new(sample_rate: u32) -> Self {
        let shared = Arc::new(GraphShared {
            left_hz: ParamCell::new(0.0),
            right_hz: ParamCell::new(0.0),
            volume: ParamCell::new(f64::from(crate::config::DEFAULT_VOLUME)),
            running: AtomicBool::new(false),
            muted: AtomicBool::new(false),
        });
        let (requests, incoming) = bounded(SAMPLE_QUEUE_DEPTH);
        let renderer = ToneRenderer {
            shared: shared.clone(),
            sample_rate: f64::from(sample_rate.max(1)),
            left_phase: 0.0,
            right_phase: 0.0,
            incoming,
            voices: Vec::with_capacity(MAX_SAMPLE_VOICES),
        };
        Self {
            shared,
            samples: HashMap::new(),
            requests,
            renderer: Some(renderer),
            handle: None,
        }
    }

    /// Hands out the processing side. Only the first call returns it.
    pub fn take_renderer(&mut self) -> Option<ToneRenderer> {
        self.renderer.take()
    }

    /// Registers a mono sample that cues can request by id.
    pub fn register_sample(&mut self, id: impl Into<String>, samples: Vec<f32>) {
        self.samples.insert(id.into(), samples.into());
    }

    fn check(&self, handle: ToneHandle) -> Result<()> {
        if self.handle == Some(handle) {
            Ok(())
        } else {
            Err(InductionError::audio(format!("unknown tone source {handle:?}")))
        }
    }
}

impl Default for SoftwareSink {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AudioSink for SoftwareSink {
    fn create_dual_tone_source(&mut self, left_hz: f64, right_hz: f64) -> Result<ToneHandle> {
        if self.handle.is_some() {
            return Err(InductionError::audio("graph already owns a dual tone source"));
        }
        self.shared.left_hz.store(left_hz);
        self.shared.right_hz.store(right_hz);
        let handle = ToneHandle(1);
        self.handle = Some(handle);
        Ok(handle)
    }

    fn update_frequencies(&mut self, handle: ToneHandle, left_hz: f64, right_hz: f64) -> Result<()> {
        self.check(handle)?;
        self.shared.left_hz.store(left_hz);
        self.shared.right_hz.store(right_hz);
        Ok(())
    }

    fn set_volume(&mut self, handle: ToneHandle, volume: f32) -> Result<()> {
        self.check(handle)?;
        self.shared.volume.store(f64::from(volume));
        Ok(())
    }

    fn play_sample(&mut self, sample_id: &str) -> Result<()> {
        let sample = self
            .samples
            .get(sample_id)
            .cloned()
            .ok_or_else(|| InductionError::cue_missing(format!("no sample registered as `{sample_id}`")))?;
        match self.requests.try_send(sample) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(sample_id, "sample queue full, dropping request");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(InductionError::audio("audio renderer has been dropped"))
            }
        }
    }

    fn start(&mut self, handle: ToneHandle) -> Result<()> {
        self.check(handle)?;
        self.shared.muted.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self, handle: ToneHandle) -> Result<()> {
        self.check(handle)?;
        self.shared.running.store(false, Ordering::Release);
        Ok(())
    }

    fn mute(&mut self, handle: ToneHandle, muted: bool) -> Result<()> {
        self.check(handle)?;
        self.shared.muted.store(muted, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for SoftwareSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSink")
            .field("shared", &self.shared)
            .field("samples", &self.samples.len())
            .field("handle", &self.handle)
            .finish()
    }
}

#[derive(Debug)]
struct SampleVoice {
    data: Arc<[f32]>,
    cursor: usize,
}

/// Processing side of the software graph. Produces interleaved stereo with
/// the left tone on channel 0 and the right tone on channel 1.
#[derive(Debug)]
pub struct ToneRenderer {
    shared: Arc<GraphShared>,
    sample_rate: f64,
    left_phase: f64,
    right_phase: f64,
    incoming: Receiver<Arc<[f32]>>,
    voices: Vec<SampleVoice>,
}

impl ToneRenderer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Fills `out` (interleaved stereo) with the next block. Parameters are
    /// read once per block, and the oscillator phases carry across blocks and
    /// frequency changes, so updates never click.
    pub fn render(&mut self, out: &mut [f32]) {
        while self.voices.len() < MAX_SAMPLE_VOICES {
            match self.incoming.try_recv() {
                Ok(data) => self.voices.push(SampleVoice { data, cursor: 0 }),
                Err(_) => break,
            }
        }

        let running = self.shared.running.load(Ordering::Acquire);
        let gain = if self.shared.muted.load(Ordering::Acquire) {
            0.0
        } else {
            self.shared.volume.load() as f32
        };
        let left_step = self.shared.left_hz.load() / self.sample_rate;
        let right_step = self.shared.right_hz.load() / self.sample_rate;

        for frame in out.chunks_exact_mut(2) {
            let (mut left, mut right) = (0.0_f32, 0.0_f32);
            if running {
                left = (TAU * self.left_phase).sin() as f32;
                right = (TAU * self.right_phase).sin() as f32;
                self.left_phase = (self.left_phase + left_step).fract();
                self.right_phase = (self.right_phase + right_step).fract();
            }
            for voice in &mut self.voices {
                if let Some(value) = voice.data.get(voice.cursor) {
                    left += value;
                    right += value;
                    voice.cursor += 1;
                }
            }
            frame[0] = left * gain;
            frame[1] = right * gain;
        }

        self.voices.retain(|voice| voice.cursor < voice.data.len());
    }

    /// Renders `seconds` of audio into a new interleaved buffer.
    pub fn render_seconds(&mut self, seconds: f64) -> Vec<f32> {
        let frames = (seconds.max(0.0) * self.sample_rate).round() as usize;
        let mut buffer = vec![0.0; frames * 2];
        self.render(&mut buffer);
        buffer
    }
}
