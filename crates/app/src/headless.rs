//! Render surface and frame loop for running sessions without a window.

use std::{
    thread,
    time::{Duration, Instant},
};

use elevate_core::{
    FrameCallback, FrameClock, FrameSource, RenderState, RenderSurface, Result, TextCue,
    ToneRenderer, DEFAULT_MAX_FRAME_DELTA,
};

/// Logs what a windowed surface would draw.
#[derive(Debug)]
pub struct HeadlessSurface {
    max_diameter: f32,
    frames: u64,
}

impl HeadlessSurface {
    pub fn new(max_diameter: f32) -> Self {
        Self {
            max_diameter,
            frames: 0,
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn present(&mut self, state: &RenderState) -> Result<()> {
        self.frames += 1;
        tracing::trace!(
            frame = self.frames,
            color = ?state.color,
            diameter = state.geometry.map(|g| g.diameter),
            "frame presented"
        );
        Ok(())
    }

    fn overlay_cue(&mut self, cue: &TextCue) -> Result<()> {
        tracing::info!(label = %cue.label, font = %cue.font, size = cue.size, "cue overlay");
        Ok(())
    }

    fn clear_overlay(&mut self) -> Result<()> {
        tracing::debug!("cue overlay cleared");
        Ok(())
    }

    fn max_diameter(&self) -> f32 {
        self.max_diameter
    }
}

/// Totals reported by [`HeadlessLoop::run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopReport {
    pub frames: u64,
    pub rendered: u64,
    pub seconds: f64,
    pub audio_frames: usize,
}

/// Fixed-rate stand-in for a display's frame callback. Pulls one audio block
/// per frame so the tone graph advances alongside the visuals.
pub struct HeadlessLoop {
    callback: Option<FrameCallback>,
    audio: Option<ToneRenderer>,
    fps: u32,
    realtime: bool,
}

impl HeadlessLoop {
    pub fn new(fps: u32, realtime: bool) -> Self {
        Self {
            callback: None,
            audio: None,
            fps: fps.max(1),
            realtime,
        }
    }

    pub fn attach_audio(&mut self, renderer: ToneRenderer) {
        self.audio = Some(renderer);
    }

    /// Runs frames until `seconds` of loop time have passed. Frames where
    /// the callback renders nothing still count.
    pub fn run(&mut self, seconds: f64, mut on_frame: impl FnMut(&LoopReport)) -> LoopReport {
        let mut report = LoopReport::default();
        let Some(callback) = self.callback.as_mut() else {
            tracing::warn!("no frame callback registered");
            return report;
        };

        let period = 1.0 / f64::from(self.fps);
        let frame_limit = if self.realtime {
            u64::MAX
        } else {
            (seconds.max(0.0) * f64::from(self.fps)).round() as u64
        };
        let mut clock = frame_clock(period);
        let mut buffer = Vec::new();
        clock.tick(Instant::now());

        while report.frames < frame_limit && report.seconds < seconds {
            let delta = if self.realtime {
                thread::sleep(Duration::from_secs_f64(period));
                clock.tick(Instant::now())
            } else {
                period
            };

            report.frames += 1;
            report.seconds = if self.realtime {
                report.seconds + delta
            } else {
                report.frames as f64 * period
            };
            if callback(delta).is_some() {
                report.rendered += 1;
            }

            if let Some(audio) = self.audio.as_mut() {
                let block = (delta * f64::from(audio.sample_rate())).round() as usize;
                buffer.resize(block * 2, 0.0);
                audio.render(&mut buffer);
                report.audio_frames += block;
            }
            on_frame(&report);
        }
        report
    }
}

/// Clock for paced frames. A slow frame rate must not have its own period
/// clamped away, so the cap is never below one frame.
fn frame_clock(period: f64) -> FrameClock {
    FrameClock::new(period.max(DEFAULT_MAX_FRAME_DELTA))
}

impl FrameSource for HeadlessLoop {
    fn register_frame_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }
}

impl std::fmt::Debug for HeadlessLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessLoop")
            .field("fps", &self.fps)
            .field("realtime", &self.realtime)
            .field("bound", &self.callback.is_some())
            .finish()
    }
}
