mod common;

use common::Harness;
use mixdeck_audio::engine::{AudioParam, TestOp};
use mixdeck_types::{Action, EffectType, Notice, OutputTarget, TrackAction, TransportAction, TransportState};

fn transport(action: TransportAction) -> Action {
    Action::Transport(action)
}

fn trim(h: &mut Harness, index: usize, start: f64, end: f64) {
    let id = h.track_id(index);
    h.act(Action::Track(TrackAction::SetTrim { id, start, end }));
}

#[test]
fn seek_inside_trim_window_is_included() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    trim(&mut h, 0, 2.0, 8.0);

    h.act(transport(TransportAction::Seek(5.9)));
    h.act(transport(TransportAction::Play));
    assert!(h.is_playing_track(id));
    let (_, playback) = h.backend.sources_started()[0];
    assert!((playback.offset - 7.9).abs() < 1e-9);
    assert!((playback.duration.unwrap() - 0.1).abs() < 1e-9);
}

#[test]
fn seek_at_trim_length_is_excluded() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    trim(&mut h, 0, 2.0, 8.0);

    h.act(transport(TransportAction::Seek(6.0)));
    h.act(transport(TransportAction::Play));
    assert!(h.deck.transport().is_playing());
    assert!(!h.is_playing_track(id));
    assert!(h.backend.sources_started().is_empty());
}

#[test]
fn zero_trim_end_plays_full_buffer() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 4.0);
    trim(&mut h, 0, 0.0, 0.0);

    h.act(transport(TransportAction::Seek(3.5)));
    h.act(transport(TransportAction::Play));
    assert!(h.is_playing_track(id));
    let (_, playback) = h.backend.sources_started()[0];
    assert!((playback.duration.unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn solo_limits_playback_to_soloed_tracks() {
    let mut h = Harness::new(0.0);
    let a = h.load(0, 4.0);
    let b = h.load(1, 4.0);
    let c = h.load(2, 4.0);
    h.act(Action::Track(TrackAction::ToggleSolo(a)));
    h.act(Action::Track(TrackAction::ToggleSolo(b)));

    h.act(transport(TransportAction::Play));
    assert!(h.is_playing_track(a));
    assert!(h.is_playing_track(b));
    assert!(!h.is_playing_track(c));
}

#[test]
fn mute_applies_at_next_play() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 4.0);
    h.act(transport(TransportAction::Play));
    h.act(Action::Track(TrackAction::ToggleMute(id)));
    assert!(h.is_playing_track(id));

    h.act(transport(TransportAction::Stop));
    h.act(transport(TransportAction::Play));
    assert!(!h.is_playing_track(id));
}

#[test]
fn volume_change_is_live_and_smoothed() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 4.0);
    h.act(transport(TransportAction::Play));
    let gain = h.deck.audio().playback().chain(id).unwrap().output_gain;
    let started = h.backend.sources_started().len();

    h.act(Action::Track(TrackAction::SetVolume(id, 0.3)));
    assert_eq!(h.backend.last_param(gain, AudioParam::Gain), Some(0.3));
    assert!(h.backend.find(|op| matches!(
        op,
        TestOp::SetParamSmoothed { node_id, target, .. } if *node_id == gain && *target == 0.3
    ))
    .is_some());
    // no rebuild
    assert_eq!(h.backend.sources_started().len(), started);
}

#[test]
fn effect_type_change_rebuilds_playing_track_at_playhead() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    let other = h.load(1, 10.0);
    h.act(transport(TransportAction::Play));
    let old = h.deck.audio().playback().chain(id).unwrap().clone();
    let untouched = h.deck.audio().playback().chain(other).unwrap().clone();

    h.run_until(2.0, 0.5);
    h.act(Action::Track(TrackAction::SetDryWet(id, 1.0)));
    h.act(Action::Track(TrackAction::SetEffectType(id, EffectType::Delay)));

    let chain = h.deck.audio().playback().chain(id).unwrap().clone();
    assert_eq!(chain.effect.effect_type, EffectType::Delay);
    assert_eq!(h.backend.last_param(chain.wet, AudioParam::Gain), Some(1.0));
    assert!(h.backend.find(|op| *op == TestOp::StopSource(old.source)).is_some());
    let (_, playback) = h
        .backend
        .sources_started()
        .into_iter()
        .find(|(source, _)| *source == chain.source)
        .unwrap();
    assert_eq!(playback.when, 2.0);
    assert!((playback.offset - 2.0).abs() < 1e-9);
    assert_eq!(h.deck.audio().playback().chain(other), Some(&untouched));
    assert!(h.deck.transport().is_playing());
}

#[test]
fn effect_type_change_while_paused_waits_for_play() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    h.act(transport(TransportAction::Play));
    h.act(transport(TransportAction::Pause));
    let started = h.backend.sources_started().len();

    h.act(Action::Track(TrackAction::SetEffectType(id, EffectType::LowPass)));
    assert_eq!(h.backend.sources_started().len(), started);
    assert!(!h.is_playing_track(id));

    h.act(transport(TransportAction::Play));
    let chain = h.deck.audio().playback().chain(id).unwrap();
    assert_eq!(chain.effect.effect_type, EffectType::LowPass);
}

#[test]
fn cleared_audio_is_freed_when_playback_stops() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 4.0);
    h.act(transport(TransportAction::Play));

    h.act(Action::Track(TrackAction::ClearAudio(id)));
    assert!(h.is_playing_track(id));
    assert!(h.deck.audio().buffer_loaded(id));

    h.act(transport(TransportAction::Stop));
    assert!(!h.deck.audio().buffer_loaded(id));
}

#[test]
fn non_loop_playback_finishes_once() {
    let mut h = Harness::new(100.0);
    let tracks = h.deck.state().tracks.tracks.clone();
    h.deck.install_project(tracks, TransportState { duration: 4.0, ..TransportState::default() });
    let id = h.load(0, 2.0);

    h.act(transport(TransportAction::Play));
    let mut finished = 0;
    for step in 1..=100 {
        h.clock.set(100.0 + step as f64 * 0.05);
        let result = h.deck.tick();
        finished += result.notices.iter().filter(|n| **n == Notice::PlaybackFinished).count();
    }
    assert_eq!(finished, 1);
    let state = h.deck.state().transport();
    assert!(!state.playing);
    assert_eq!(state.current_time, 0.0);
    assert!(!h.is_playing_track(id));
    assert!(!h.deck.audio().is_playing());
}

#[test]
fn loop_wraps_position() {
    let mut h = Harness::new(0.0);
    let tracks = h.deck.state().tracks.tracks.clone();
    h.deck.install_project(tracks, TransportState { duration: 4.0, loop_enabled: true, ..TransportState::default() });
    h.act(transport(TransportAction::Play));
    h.run_until(5.0, 0.25);
    let state = h.deck.state().transport();
    assert!(state.playing);
    assert!((state.current_time - 1.0).abs() < 1e-9);
}

#[test]
fn pause_releases_handles_and_keeps_position() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    h.act(transport(TransportAction::Play));
    h.run_until(3.0, 0.5);
    h.act(transport(TransportAction::Pause));

    assert!(!h.is_playing_track(id));
    assert!((h.deck.state().transport().current_time - 3.0).abs() < 1e-9);

    h.clock.advance(10.0);
    h.act(transport(TransportAction::Play));
    let (_, playback) = *h.backend.sources_started().last().unwrap();
    assert!((playback.offset - 3.0).abs() < 1e-9);

    h.act(transport(TransportAction::Stop));
    assert_eq!(h.deck.state().transport().current_time, 0.0);
    assert_eq!(h.deck.transport().seek_offset(), 0.0);
}

#[test]
fn stop_is_safe_when_idle() {
    let mut h = Harness::new(0.0);
    h.act(transport(TransportAction::Stop));
    h.act(transport(TransportAction::Stop));
    assert!(!h.deck.audio().is_playing());
}

#[test]
fn device_output_binds_a_sink() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 4.0);
    h.act(Action::Track(TrackAction::SetOutput(id, OutputTarget::Device("usb-3".into()))));
    h.act(transport(TransportAction::Play));
    assert!(h.backend.find(|op| matches!(
        op,
        TestOp::BindSink { device_id, .. } if device_id == "usb-3"
    ))
    .is_some());
}

#[test]
fn clip_indication_dwells_then_clears() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 10.0);
    h.act(transport(TransportAction::Play));
    let analyser = h.deck.audio().playback().chain(id).unwrap().analyser;

    h.backend.set_peak(analyser, 1.2);
    h.deck.tick();
    assert!(h.deck.state().track(id).unwrap().clipping);

    h.backend.set_peak(analyser, 0.4);
    h.clock.set(1.0);
    h.deck.tick();
    assert!(h.deck.state().track(id).unwrap().clipping);

    h.clock.set(1.6);
    h.deck.tick();
    assert!(!h.deck.state().track(id).unwrap().clipping);
}

#[test]
fn load_audio_decodes_and_resamples() {
    let mut h = Harness::new(0.0);
    let id = h.track_id(1);
    let bytes = common::wav_bytes(1.0, 16_000);
    h.deck.load_audio(id, "kick.wav", &bytes).unwrap();

    let track = h.deck.state().track(id).unwrap();
    assert_eq!(track.name, "kick");
    let buffer = track.buffer.as_ref().unwrap();
    assert_eq!(buffer.sample_rate(), common::RATE);
    assert!((buffer.duration() - 1.0).abs() < 0.01);
}

#[test]
fn load_failure_leaves_track_untouched() {
    let mut h = Harness::new(0.0);
    let id = h.load(0, 2.0);
    assert!(h.deck.load_audio(id, "broken.wav", b"not a wav").is_err());
    let track = h.deck.state().track(id).unwrap();
    assert_eq!(track.name, "clip0");
    assert!(track.has_audio());
}
