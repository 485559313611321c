use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{InductionError, Result};

/// Number of phases in a breath cycle: inhale, hold, exhale, hold.
pub const PHASE_COUNT: usize = 4;

/// Largest frame delta handed to the scheduler by [`FrameClock`].
pub const DEFAULT_MAX_FRAME_DELTA: f64 = 0.1;

const DEFAULT_CUE_LABELS: [&str; PHASE_COUNT] = ["Inhale", "Hold", "Exhale", "Hold"];

/// Where a text overlay sits on the surface, in surface pixels from the
/// top-left corner. Negative values count from the opposite edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuePosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCue {
    pub label: String,
    pub font: String,
    pub size: f32,
    pub position: CuePosition,
}

impl TextCue {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            font: "Sans".to_string(),
            size: 48.0,
            position: CuePosition { x: 12.0, y: -20.0 },
        }
    }
}

/// What announces a phase when it begins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueSpec {
    #[default]
    None,
    Text(TextCue),
    Audio { sample_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub duration_seconds: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub cue: CueSpec,
}

fn default_active() -> bool {
    true
}

impl PhaseSpec {
    pub fn new(duration_seconds: f64, cue: CueSpec) -> Self {
        Self {
            duration_seconds,
            active: true,
            cue,
        }
    }
}

/// The ordered, cyclic description of the four phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseTimeline {
    phases: [PhaseSpec; PHASE_COUNT],
}

impl Default for PhaseTimeline {
    fn default() -> Self {
        Self {
            phases: DEFAULT_CUE_LABELS
                .map(|label| PhaseSpec::new(4.0, CueSpec::Text(TextCue::new(label)))),
        }
    }
}

impl PhaseTimeline {
    pub fn new(phases: [PhaseSpec; PHASE_COUNT]) -> Result<Self> {
        let timeline = Self { phases };
        timeline.validate()?;
        Ok(timeline)
    }

    /// Default cues with the given phase durations.
    pub fn from_durations(durations: [f64; PHASE_COUNT]) -> Result<Self> {
        Self::default().with_durations(durations)
    }

    /// Returns a copy with new durations, keeping flags and cues.
    pub fn with_durations(&self, durations: [f64; PHASE_COUNT]) -> Result<Self> {
        let mut next = self.clone();
        for (phase, duration) in next.phases.iter_mut().zip(durations) {
            phase.duration_seconds = duration;
        }
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> Result<()> {
        for (index, phase) in self.phases.iter().enumerate() {
            if !phase.duration_seconds.is_finite() || phase.duration_seconds <= 0.0 {
                return Err(InductionError::config(format!(
                    "phase {index} duration {} must be a positive number of seconds",
                    phase.duration_seconds
                )));
            }
        }
        if !self.phases.iter().any(|phase| phase.active) {
            return Err(InductionError::config("at least one phase must be active"));
        }
        Ok(())
    }

    pub fn phases(&self) -> &[PhaseSpec; PHASE_COUNT] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> &PhaseSpec {
        &self.phases[index % PHASE_COUNT]
    }

    pub fn phase_mut(&mut self, index: usize) -> &mut PhaseSpec {
        &mut self.phases[index % PHASE_COUNT]
    }

    pub fn duration(&self, index: usize) -> f64 {
        self.phase(index).duration_seconds
    }

    pub fn durations(&self) -> [f64; PHASE_COUNT] {
        self.phases.each_ref().map(|phase| phase.duration_seconds)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.phase(index).active
    }

    pub fn cycle_seconds(&self) -> f64 {
        self.phases.iter().map(|phase| phase.duration_seconds).sum()
    }

    /// Shortest duration among active phases; bounds the crossfade window.
    pub fn min_active_duration(&self) -> Option<f64> {
        self.phases
            .iter()
            .filter(|phase| phase.active)
            .map(|phase| phase.duration_seconds)
            .reduce(f64::min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasePosition {
    pub index: usize,
    pub elapsed: f64,
}

/// Result of one [`PhaseScheduler::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTick {
    pub position: PhasePosition,
    /// Set when this tick entered an active phase (the last one, if several
    /// boundaries were crossed).
    pub entered: Option<usize>,
}

/// Advances the repeating four-phase cycle by externally supplied deltas.
#[derive(Debug)]
pub struct PhaseScheduler {
    timeline: PhaseTimeline,
    state: SchedulerState,
    index: usize,
    elapsed: f64,
    total_elapsed: f64,
    pending_entry: bool,
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseScheduler {
    pub fn new() -> Self {
        Self {
            timeline: PhaseTimeline::default(),
            state: SchedulerState::Idle,
            index: 0,
            elapsed: 0.0,
            total_elapsed: 0.0,
            pending_entry: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn timeline(&self) -> &PhaseTimeline {
        &self.timeline
    }

    pub fn position(&self) -> PhasePosition {
        PhasePosition {
            index: self.index,
            elapsed: self.elapsed,
        }
    }

    /// Seconds spent running since the last start, pauses excluded.
    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    /// Begins a fresh cycle at the start of phase 0. A running cycle is
    /// discarded and restarted.
    pub fn start(&mut self, timeline: PhaseTimeline) -> Result<()> {
        timeline.validate()?;
        self.pending_entry = timeline.is_active(0);
        self.timeline = timeline;
        self.state = SchedulerState::Running;
        self.index = 0;
        self.elapsed = 0.0;
        self.total_elapsed = 0.0;
        Ok(())
    }

    /// Swaps in new phase durations or cues without moving the position. An
    /// elapsed time beyond a shortened phase carries over on the next tick.
    pub fn set_timeline(&mut self, timeline: PhaseTimeline) -> Result<()> {
        timeline.validate()?;
        self.timeline = timeline;
        Ok(())
    }

    pub fn advance(&mut self, delta_seconds: f64) -> PhaseTick {
        let mut entered = None;
        if self.state != SchedulerState::Running {
            return self.tick(entered);
        }
        if std::mem::take(&mut self.pending_entry) {
            entered = Some(0);
        }
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return self.tick(entered);
        }

        self.total_elapsed += delta_seconds;
        self.elapsed += delta_seconds;

        // Whole cycles change nothing but the clock; drop all but the last so
        // the loop below stays bounded.
        let cycle = self.timeline.cycle_seconds();
        if self.elapsed >= 2.0 * cycle {
            let whole = (self.elapsed / cycle).floor() - 1.0;
            self.elapsed -= whole * cycle;
        }

        loop {
            let duration = self.timeline.duration(self.index);
            if self.elapsed < duration {
                break;
            }
            self.elapsed -= duration;
            self.index = (self.index + 1) % PHASE_COUNT;
            if self.timeline.is_active(self.index) {
                entered = Some(self.index);
            }
        }

        tracing::trace!(phase = self.index, elapsed = self.elapsed, "scheduler advanced");
        self.tick(entered)
    }

    pub fn pause(&mut self) {
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SchedulerState::Paused {
            self.state = SchedulerState::Running;
        }
    }

    /// Returns to Idle at the start of phase 0. Safe from any state.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Idle;
        self.index = 0;
        self.elapsed = 0.0;
        self.total_elapsed = 0.0;
        self.pending_entry = false;
    }

    fn tick(&self, entered: Option<usize>) -> PhaseTick {
        PhaseTick {
            position: self.position(),
            entered,
        }
    }
}

/// Converts monotonic frame timestamps into the deltas fed to
/// [`PhaseScheduler::advance`].
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_frame_delta: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_DELTA)
    }
}

impl FrameClock {
    pub fn new(max_frame_delta: f64) -> Self {
        Self {
            last: None,
            max_frame_delta: max_frame_delta.max(0.0),
        }
    }

    /// Delta since the previous frame, clamped to `[0, max_frame_delta]`.
    /// The first frame after a reset yields zero.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let delta = self
            .last
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta.min(self.max_frame_delta)
    }

    /// Forgets the last timestamp so time spent paused is never reported.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn running(durations: [f64; 4]) -> PhaseScheduler {
        let mut scheduler = PhaseScheduler::new();
        scheduler
            .start(PhaseTimeline::from_durations(durations).unwrap())
            .unwrap();
        scheduler
    }

    #[test]
    fn rejects_non_positive_durations() {
        assert!(PhaseTimeline::from_durations([4.0, 0.0, 4.0, 4.0]).is_err());
        assert!(PhaseTimeline::from_durations([4.0, -1.0, 4.0, 4.0]).is_err());
        assert!(PhaseTimeline::from_durations([f64::NAN, 1.0, 4.0, 4.0]).is_err());
        let spec = |duration| PhaseSpec::new(duration, CueSpec::None);
        assert!(PhaseTimeline::new([spec(1.0), spec(1.0), spec(0.0), spec(1.0)]).is_err());
    }

    #[test]
    fn rejects_all_inactive_timeline() {
        let mut timeline = PhaseTimeline::default();
        for index in 0..PHASE_COUNT {
            timeline.phase_mut(index).active = false;
        }
        let mut scheduler = PhaseScheduler::new();
        let err = scheduler.start(timeline).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn visits_phases_in_cyclic_order() {
        let mut scheduler = running([0.3, 0.7, 1.1, 0.2]);
        let mut visited = Vec::new();
        for _ in 0..2_000 {
            if let Some(phase) = scheduler.advance(1.0 / 60.0).entered {
                visited.push(phase);
            }
        }
        assert!(visited.len() > 20);
        for (i, phase) in visited.iter().enumerate() {
            assert_eq!(*phase, i % PHASE_COUNT);
        }
    }

    #[test]
    fn carries_overshoot_into_next_phase() {
        let mut scheduler = running([1.0, 2.0, 1.0, 1.0]);
        scheduler.advance(0.0);
        let tick = scheduler.advance(1.25);
        assert_eq!(tick.entered, Some(1));
        assert_eq!(tick.position.index, 1);
        assert!((tick.position.elapsed - 0.25).abs() < 1e-12);
    }

    #[test]
    fn first_tick_announces_phase_zero() {
        let mut scheduler = running([1.0; 4]);
        assert_eq!(scheduler.advance(0.016).entered, Some(0));
        assert_eq!(scheduler.advance(0.016).entered, None);
    }

    #[test]
    fn multiple_boundaries_report_last_phase() {
        let mut scheduler = running([1.0; 4]);
        scheduler.advance(0.0);
        let tick = scheduler.advance(2.5);
        assert_eq!(tick.entered, Some(2));
        assert!((tick.position.elapsed - 0.5).abs() < 1e-12);
    }

    #[test]
    fn huge_delta_keeps_phase_alignment() {
        let mut scheduler = running([1.0, 2.0, 3.0, 4.0]);
        scheduler.advance(0.0);
        let tick = scheduler.advance(10.0 * 1_000.0 + 3.5);
        assert_eq!(tick.position.index, 2);
        assert!((tick.position.elapsed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn inactive_phases_consume_time_silently() {
        let mut silent = PhaseSpec::new(1.0, CueSpec::None);
        silent.active = false;
        let timeline = PhaseTimeline::new([
            PhaseSpec::new(1.0, CueSpec::Text(TextCue::new("In"))),
            silent,
            PhaseSpec::new(1.0, CueSpec::Text(TextCue::new("Out"))),
            PhaseSpec::new(1.0, CueSpec::None),
        ])
        .unwrap();
        let mut scheduler = PhaseScheduler::new();
        scheduler.start(timeline).unwrap();
        scheduler.advance(0.0);

        let tick = scheduler.advance(1.5);
        assert_eq!(tick.position.index, 1);
        assert_eq!(tick.entered, None);

        let tick = scheduler.advance(1.0);
        assert_eq!(tick.position.index, 2);
        assert_eq!(tick.entered, Some(2));
        assert!((scheduler.total_elapsed() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn pause_freezes_position() {
        let mut scheduler = running([4.0; 4]);
        scheduler.advance(5.3);
        let before = scheduler.position();

        scheduler.pause();
        for _ in 0..100 {
            scheduler.advance(1.0);
        }
        scheduler.resume();

        assert_eq!(scheduler.position(), before);
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[test]
    fn stop_is_idempotent_and_resets() {
        let mut scheduler = running([4.0; 4]);
        scheduler.advance(6.0);
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.position(), PhasePosition { index: 0, elapsed: 0.0 });
        assert_eq!(scheduler.advance(1.0).position.index, 0);
    }

    #[test]
    fn shortened_phase_carries_on_next_tick() {
        let mut scheduler = running([4.0; 4]);
        scheduler.advance(3.0);
        scheduler
            .set_timeline(PhaseTimeline::from_durations([2.0, 4.0, 4.0, 4.0]).unwrap())
            .unwrap();
        let tick = scheduler.advance(0.5);
        assert_eq!(tick.position.index, 1);
        assert!((tick.position.elapsed - 1.5).abs() < 1e-12);
    }

    #[test]
    fn frame_clock_clamps_and_forgets_pauses() {
        let start = Instant::now();
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(start), 0.0);
        let delta = clock.tick(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-9);
        assert_eq!(clock.tick(start + Duration::from_secs(5)), DEFAULT_MAX_FRAME_DELTA);

        clock.reset();
        assert_eq!(clock.tick(start + Duration::from_secs(60)), 0.0);
    }
}
