use std::sync::{Arc, Mutex};

use elevate_core::{
    AnimationConfig, AnimationVariant, BouncyBallConfig, ColorSwapConfig, CueSpec, FrameCallback, FrameSource,
    InductionController, InductionEvent, InductionHandle, RenderState, RenderSurface, Result,
    Rgba, SessionConfig, SessionStatus, SoftwareSink, SpectrumProbe, TextCue, ToneRenderer,
};

#[derive(Debug, Clone, PartialEq)]
enum Drawn {
    Frame(RenderState),
    Overlay(String),
    Cleared,
}

#[derive(Clone, Default)]
struct RecordingSurface {
    log: Arc<Mutex<Vec<Drawn>>>,
}

impl RenderSurface for RecordingSurface {
    fn present(&mut self, state: &RenderState) -> Result<()> {
        self.log.lock().unwrap().push(Drawn::Frame(*state));
        Ok(())
    }

    fn overlay_cue(&mut self, cue: &TextCue) -> Result<()> {
        self.log.lock().unwrap().push(Drawn::Overlay(cue.label.clone()));
        Ok(())
    }

    fn clear_overlay(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(Drawn::Cleared);
        Ok(())
    }

    fn max_diameter(&self) -> f32 {
        300.0
    }
}

#[derive(Default)]
struct FakeDisplay {
    callback: Option<FrameCallback>,
}

impl FrameSource for FakeDisplay {
    fn register_frame_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }
}

impl FakeDisplay {
    fn frame(&mut self, delta: f64) -> Option<RenderState> {
        self.callback.as_mut().and_then(|callback| callback(delta))
    }
}

struct Rig {
    controller: InductionController,
    renderer: ToneRenderer,
    log: Arc<Mutex<Vec<Drawn>>>,
}

fn rig(sample_rate: u32) -> Rig {
    let mut sink = SoftwareSink::new(sample_rate);
    let renderer = sink.take_renderer().unwrap();
    let surface = RecordingSurface::default();
    let log = surface.log.clone();
    Rig {
        controller: InductionController::new(Box::new(sink), Box::new(surface)),
        renderer,
        log,
    }
}

fn visual(stimuli_type: i32) -> SessionConfig {
    SessionConfig {
        enable_visual_stimuli: true,
        ..SessionConfig::default()
    }
    .with_stimuli_type(stimuli_type)
}

fn entered_phases(events: &[InductionEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            InductionEvent::PhaseEntered(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

#[test]
fn phases_cycle_in_order_with_carry_over() {
    let mut rig = rig(8_000);
    let mut config = visual(0);
    config.timeline = config.timeline.with_durations([2.0, 1.0, 2.0, 1.0]).unwrap();
    rig.controller.start_induction(config).unwrap();

    for _ in 0..130 {
        rig.controller.tick(0.1);
    }

    let phases = entered_phases(&rig.controller.drain_events());
    assert_eq!(phases, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
    let position = rig.controller.scheduler().position();
    assert_eq!(position.index, 0);
    assert!((position.elapsed - 1.0).abs() < 1e-9);
}

#[test]
fn cue_overlay_precedes_the_frame_of_its_phase() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(visual(0)).unwrap();
    rig.controller.tick(0.0);
    rig.controller.tick(3.9);
    rig.controller.tick(0.2);

    let log = rig.log.lock().unwrap();
    assert_eq!(log[0], Drawn::Overlay("Inhale".into()));
    assert!(matches!(log[1], Drawn::Frame(_)));
    assert!(matches!(log[2], Drawn::Frame(_)));
    assert_eq!(log[3], Drawn::Cleared);
    assert_eq!(log[4], Drawn::Overlay("Hold".into()));
    assert!(matches!(log[5], Drawn::Frame(_)));
}

#[test]
fn overlay_is_cleared_when_an_inactive_phase_begins() {
    let mut rig = rig(8_000);
    let mut config = visual(0);
    config.timeline.phase_mut(1).active = false;
    rig.controller.start_induction(config).unwrap();
    rig.controller.tick(0.0);
    rig.controller.tick(4.5);
    rig.controller.tick(3.0);

    let log = rig.log.lock().unwrap();
    let cues: Vec<&Drawn> = log.iter().filter(|d| !matches!(d, Drawn::Frame(_))).collect();
    assert_eq!(cues, vec![&Drawn::Overlay("Inhale".into()), &Drawn::Cleared]);
    assert_eq!(log[2], Drawn::Cleared);
}

fn grey_ramp() -> SessionConfig {
    let mut config = visual(0);
    let hex = |value: &str| Rgba::from_hex(value).unwrap();
    config.animation = AnimationConfig::ColorSwap(ColorSwapConfig {
        phase_colors: [hex("#FFFFFF"), hex("#EEEEEE"), hex("#DDDDDD"), hex("#CCCCCC")],
        fade_duration: 0.5,
    });
    config
}

fn assert_close(actual: Rgba, expected: Rgba, tolerance: f32) {
    for (a, e) in [
        (actual.r, expected.r),
        (actual.g, expected.g),
        (actual.b, expected.b),
        (actual.a, expected.a),
    ] {
        assert!((a - e).abs() <= tolerance, "{actual:?} != {expected:?}");
    }
}

#[test]
fn colour_swap_fades_into_the_next_phase_colour() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(grey_ramp()).unwrap();
    let white = Rgba::from_hex("#FFFFFF").unwrap();
    let next = Rgba::from_hex("#EEEEEE").unwrap();
    rig.controller.tick(0.0);

    let before_fade = rig.controller.tick(3.4).unwrap();
    assert_eq!(before_fade.color, white);

    let midway = rig.controller.tick(0.35).unwrap();
    assert_close(midway.color, white.lerp(next, 0.5), 1e-4);

    let boundary = rig.controller.tick(0.25).unwrap();
    assert_close(boundary.color, next, 1e-6);
}

#[test]
fn bouncy_ball_stays_inside_the_surface() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(visual(2)).unwrap();

    for _ in 0..400 {
        let state = rig.controller.tick(0.05).unwrap();
        let diameter = state.geometry.unwrap().diameter;
        assert!((0.0..=300.0).contains(&diameter), "diameter {diameter}");
        assert!(state.background.is_some());
    }
}

#[test]
fn pause_and_resume_do_not_drift() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(visual(0)).unwrap();
    rig.controller.tick(2.5);
    let before = rig.controller.scheduler().position();

    rig.controller.pause_induction();
    assert!(rig.controller.tick(100.0).is_none());
    rig.controller.resume_induction();
    rig.controller.tick(1.0);

    let after = rig.controller.scheduler().position();
    assert_eq!(after.index, before.index);
    assert!((after.elapsed - (before.elapsed + 1.0)).abs() < 1e-9);
    assert!((rig.controller.elapsed_seconds() - 3.5).abs() < 1e-9);
}

#[test]
fn live_retune_reaches_the_rendered_audio() {
    let mut rig = rig(16_000);
    rig.controller.start_induction(SessionConfig::default()).unwrap();
    let mut probe = SpectrumProbe::new(16_000);

    let reading = probe.measure_binaural(&rig.renderer.render_seconds(1.0)).unwrap();
    assert!((reading.left_hz - 200.0).abs() < 0.5);
    assert!((reading.beat_hz - 10.0).abs() < 1.0);

    rig.controller.set_base_frequency(400.0).unwrap();
    rig.controller.set_channel_offset(6.0).unwrap();
    let reading = probe.measure_binaural(&rig.renderer.render_seconds(1.0)).unwrap();
    assert!((reading.left_hz - 400.0).abs() < 0.5);
    assert!((reading.right_hz - 406.0).abs() < 0.5);
}

#[test]
fn pause_silences_and_stop_ends_the_tones() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(SessionConfig::default()).unwrap();
    assert!(rig.renderer.render_seconds(0.05).iter().any(|s| *s != 0.0));

    rig.controller.pause_induction();
    assert!(rig.renderer.render_seconds(0.05).iter().all(|s| *s == 0.0));
    rig.controller.resume_induction();
    assert!(rig.renderer.render_seconds(0.05).iter().any(|s| *s != 0.0));

    rig.controller.stop_induction();
    assert!(rig.renderer.render_seconds(0.05).iter().all(|s| *s == 0.0));
}

#[test]
fn audio_cue_plays_the_registered_sample() {
    let mut sink = SoftwareSink::new(8_000);
    let mut renderer = sink.take_renderer().unwrap();
    sink.register_sample("chime", vec![0.25; 16]);
    let mut controller =
        InductionController::new(Box::new(sink), Box::new(RecordingSurface::default()));

    let mut config = SessionConfig::default();
    config.audio.playing = false;
    config.timeline.phase_mut(0).cue = CueSpec::Audio {
        sample_id: "chime".to_string(),
    };
    controller.start_induction(config).unwrap();
    controller.tick(0.0);

    let block = renderer.render_seconds(0.01);
    assert!(block[..32].iter().all(|s| *s > 0.0));
    assert!(!controller
        .drain_events()
        .iter()
        .any(|event| matches!(event, InductionEvent::CueSkipped { .. })));
}

#[test]
fn handle_callback_follows_the_session_lifecycle() {
    let surface = RecordingSurface::default();
    let handle = InductionHandle::new(InductionController::new(
        Box::new(SoftwareSink::default()),
        Box::new(surface),
    ));
    let mut display = FakeDisplay::default();

    handle.start_induction(visual(0)).unwrap();
    handle.bind(&mut display);
    assert!(display.frame(0.5).is_some());

    handle.pause_induction();
    assert!(display.frame(0.5).is_none());
    handle.resume_induction();
    assert!(display.frame(0.5).is_some());

    handle.stop_induction();
    assert!(display.frame(0.5).is_none());
    assert_eq!(handle.current_status(), SessionStatus::Idle);

    handle.start_induction(visual(0)).unwrap();
    assert!(display.frame(0.5).is_none());
    handle.bind(&mut display);
    assert!(display.frame(0.5).is_some());
}

#[test]
fn variant_switch_mid_session_keeps_the_phase_position() {
    let mut rig = rig(8_000);
    rig.controller.start_induction(visual(0)).unwrap();
    rig.controller.tick(5.0);
    let position = rig.controller.scheduler().position();

    rig.controller
        .set_animation_variant(
            AnimationVariant::BouncyBall,
            AnimationConfig::BouncyBall(BouncyBallConfig::default()),
        )
        .unwrap();
    let state = rig.controller.tick(0.0).unwrap();

    assert_eq!(rig.controller.scheduler().position(), position);
    assert!(state.geometry.is_some());
    assert_eq!(rig.controller.current_status(), SessionStatus::Playing);
}

#[test]
fn session_config_survives_a_json_round_trip() {
    let mut config = visual(2);
    config.timeline = config.timeline.with_durations([3.0, 1.5, 3.0, 1.5]).unwrap();
    let json = config.to_json_string_pretty().unwrap();
    let parsed = SessionConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, config);

    let mut rig = rig(8_000);
    rig.controller.start_induction(parsed).unwrap();
    assert_eq!(
        rig.controller.scheduler().timeline().durations(),
        [3.0, 1.5, 3.0, 1.5]
    );
}
