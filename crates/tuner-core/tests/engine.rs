//! End-to-end behaviour of the tuner engine on virtual time.
//!
//! Run with: cargo test -p tuner-core --test engine

use std::time::Duration;

use tuner_core::config::Config;
use tuner_core::coordinator::PlayOutcome;
use tuner_core::engine::SwitchOutcome;
use tuner_core::media::{ClockBackend, MediaHandle};
use tuner_core::sequencer::Phase;
use tuner_core::station::Content;
use tuner_core::{Command, LoveChoice, TunerEngine, TunerError};

const GATED: usize = 3;

fn open_backend() -> ClockBackend {
    ClockBackend::new(120.0).without_gesture_gate()
}

fn engine(backend: ClockBackend) -> TunerEngine<ClockBackend> {
    let content = Content::builtin().expect("built-in content should parse");
    TunerEngine::new(content, &Config::default(), backend)
}

fn main_source(engine: &TunerEngine<ClockBackend>) -> Option<String> {
    engine
        .coordinator()
        .main
        .handle()
        .map(|h| h.source().to_string())
}

async fn settle_transition(engine: &mut TunerEngine<ClockBackend>, outcome: SwitchOutcome) -> Option<PlayOutcome> {
    let SwitchOutcome::Deferred { generation, delay } = outcome else {
        panic!("expected a deferred switch, got {outcome:?}");
    };
    tokio::time::sleep(delay).await;
    engine
        .complete_transition(generation)
        .await
        .expect("transition should complete")
}

#[tokio::test(start_paused = true)]
async fn every_open_station_plays_alone() {
    let mut engine = engine(open_backend());
    for index in 0..GATED {
        let outcome = engine.switch_to_station(index, false).await.unwrap();
        assert_eq!(outcome, SwitchOutcome::Finished(PlayOutcome::Started));
        assert_eq!(engine.playing_count(), 1);

        let expected = engine.registry().get(index).unwrap().source.clone();
        assert_eq!(main_source(&engine), expected);
        assert_eq!(engine.sequencer().phase(), Phase::Playing);
    }
}

#[tokio::test(start_paused = true)]
async fn stop_all_audio_silences_every_surface() {
    let mut engine = engine(open_backend());
    engine.switch_to_station(1, false).await.unwrap();
    engine.stop_all_audio().await;
    assert_eq!(engine.playing_count(), 0);
    assert!(main_source(&engine).is_none());

    engine.card_toggle("3").await.unwrap();
    assert_eq!(engine.playing_count(), 1);
    engine.stop_all_audio().await;
    assert_eq!(engine.playing_count(), 0);
    assert!(!engine.snapshot().is_playing);
}

#[tokio::test(start_paused = true)]
async fn stop_all_audio_rewinds_cards() {
    let mut engine = engine(open_backend());
    engine.card_toggle("1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(engine.coordinator().cards.get("1").unwrap().position() >= 10.0);

    engine.stop_all_audio().await;
    let card = engine.coordinator().cards.get("1").unwrap();
    assert!(!card.is_playing());
    assert_eq!(card.position(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn gated_station_needs_a_choice() {
    let mut engine = engine(open_backend());

    let outcome = engine.switch_to_station(GATED, false).await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Finished(PlayOutcome::AwaitingChoice));
    assert_eq!(engine.playing_count(), 0);
    assert!(main_source(&engine).is_none());

    engine.switch_to_station(2, false).await.unwrap();
    assert_eq!(engine.playing_count(), 1);
    let outcome = engine.next_station().await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Prompted);
    assert_eq!(engine.playing_count(), 0);

    let snap = engine.snapshot();
    assert!(snap.prompt_open);
    assert_eq!(snap.current_station, GATED);
    assert_eq!(snap.displayed_station, 2);
    assert_eq!(snap.active_preset, Some(GATED));

    let outcome = engine.set_love_choice(LoveChoice::Loving).await.unwrap();
    assert_eq!(settle_transition(&mut engine, outcome).await, Some(PlayOutcome::Started));
    assert_eq!(main_source(&engine).as_deref(), Some("audio/naz2.mp3"));
    assert_eq!(engine.playing_count(), 1);

    let snap = engine.snapshot();
    assert!(!snap.prompt_open);
    assert_eq!(snap.love_choice, Some(LoveChoice::Loving));
    assert_eq!(snap.displayed().unwrap().track, "Our Choice in Love");
}

#[tokio::test(start_paused = true)]
async fn other_choice_resolves_other_source() {
    let mut engine = engine(open_backend());
    let outcome = engine.set_love_choice(LoveChoice::BeingLoved).await.unwrap();
    settle_transition(&mut engine, outcome).await;
    assert_eq!(main_source(&engine).as_deref(), Some("audio/naz1.mp3"));
}

#[tokio::test(start_paused = true)]
async fn dismissing_the_prompt_plays_nothing() {
    let mut engine = engine(open_backend());
    engine.select_preset(GATED).await.unwrap();
    assert!(engine.snapshot().prompt_open);
    engine.dismiss_choice_prompt();
    assert!(!engine.snapshot().prompt_open);
    assert_eq!(engine.playing_count(), 0);
    assert_eq!(engine.sequencer().choice(), None);
}

#[tokio::test(start_paused = true)]
async fn superseded_transition_does_nothing() {
    let mut engine = engine(open_backend());
    let first = engine.switch_to_station(0, true).await.unwrap();
    let second = engine.switch_to_station(1, true).await.unwrap();

    let SwitchOutcome::Deferred { generation: stale, delay } = first else {
        panic!("expected deferred");
    };
    tokio::time::sleep(delay).await;
    assert_eq!(engine.complete_transition(stale).await.unwrap(), None);
    assert_eq!(engine.playing_count(), 0);
    assert!(engine.snapshot().changing);

    assert_eq!(settle_transition(&mut engine, second).await, Some(PlayOutcome::Started));
    assert_eq!(main_source(&engine).as_deref(), Some("audio/iqra.mp3"));
    assert!(!engine.snapshot().changing);
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_cancels_pending_switch() {
    let mut engine = engine(open_backend());
    let outcome = engine.switch_to_station(2, true).await.unwrap();
    engine.stop_all_audio().await;
    let SwitchOutcome::Deferred { generation, .. } = outcome else {
        panic!("expected deferred");
    };
    assert_eq!(engine.complete_transition(generation).await.unwrap(), None);
    assert_eq!(engine.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn card_activation_is_exclusive() {
    let mut engine = engine(open_backend());
    engine.switch_to_station(0, false).await.unwrap();

    assert!(engine.card_toggle("2").await.unwrap());
    assert_eq!(engine.playing_count(), 1);
    assert!(!engine.snapshot().is_playing);

    assert!(engine.card_toggle("4").await.unwrap());
    assert_eq!(engine.playing_count(), 1);
    assert!(!engine.coordinator().cards.is_card_playing("2").unwrap());

    assert!(!engine.card_toggle("4").await.unwrap());
    assert_eq!(engine.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn card_activation_cancels_pending_switch() {
    let mut engine = engine(open_backend());
    let outcome = engine.switch_to_station(1, true).await.unwrap();
    engine.card_toggle("1").await.unwrap();
    let SwitchOutcome::Deferred { generation, delay } = outcome else {
        panic!("expected deferred");
    };
    tokio::time::sleep(delay).await;
    assert_eq!(engine.complete_transition(generation).await.unwrap(), None);
    assert_eq!(engine.playing_count(), 1);
    assert!(engine.coordinator().cards.is_card_playing("1").unwrap());
}

#[tokio::test(start_paused = true)]
async fn card_length_comes_from_the_content_table() {
    let mut content = Content::builtin().unwrap();
    content.cards[0].duration_secs = Some(5.0);
    let backend = ClockBackend::new(180.0).without_gesture_gate();
    let mut engine = TunerEngine::new(content, &Config::default(), backend);
    assert_eq!(engine.coordinator().cards.get("1").unwrap().duration(), Some(5.0));
    assert_eq!(engine.coordinator().cards.get("2").unwrap().duration(), Some(180.0));

    engine.card_toggle("1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(engine.poll());
    assert_eq!(engine.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn card_navigation_wraps_at_both_ends() {
    let mut engine = engine(open_backend());
    engine.card_toggle("4").await.unwrap();

    assert_eq!(engine.card_next("4").await.unwrap(), "1");
    assert!(engine.coordinator().cards.is_card_playing("1").unwrap());
    assert_eq!(engine.playing_count(), 1);

    assert_eq!(engine.card_prev("1").await.unwrap(), "4");
    assert!(engine.coordinator().cards.is_card_playing("4").unwrap());
    assert_eq!(engine.playing_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn card_neighbor_starts_from_the_top() {
    let mut engine = engine(open_backend());
    engine.card_seek("2", 40.0).unwrap();
    engine.card_toggle("1").await.unwrap();
    engine.card_next("1").await.unwrap();
    let card = engine.coordinator().cards.get("2").unwrap();
    assert!(card.position() < 1.0);
}

#[tokio::test(start_paused = true)]
async fn scan_visits_stations_in_order() {
    let mut engine = engine(open_backend());
    assert!(engine.start_scan());
    let mut visited = Vec::new();
    for _ in 0..5 {
        let outcome = engine.scan_step().await.unwrap().expect("scan is active");
        visited.push(engine.sequencer().current());
        settle_transition(&mut engine, outcome).await;
    }
    assert_eq!(visited, vec![0, 1, 2, 3, 0]);

    assert!(engine.stop_scan());
    assert_eq!(engine.scan_step().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn navigation_stops_scanning() {
    let mut engine = engine(open_backend());
    engine.start_scan();
    engine.next_station().await.unwrap();
    assert!(!engine.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn refused_start_degrades_to_not_playing() {
    let mut engine = engine(ClockBackend::new(120.0));
    let outcome = engine.switch_to_station(0, false).await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Finished(PlayOutcome::Blocked));
    assert_eq!(engine.playing_count(), 0);
    assert!(!engine.snapshot().is_playing);

    engine.note_gesture();
    assert_eq!(
        engine.toggle_main_playback().await.unwrap(),
        Some(PlayOutcome::Started)
    );
    assert_eq!(engine.playing_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn gesture_commands_unlock_playback() {
    let mut engine = engine(ClockBackend::new(120.0));
    assert!(!engine.narrative().is_active());
    engine.apply(Command::TogglePlayback).await.unwrap();
    let snap = engine.snapshot();
    assert!(snap.is_playing);
    assert!(snap.gesture_seen);
    assert!(snap.narrative.active);

    engine.apply(Command::TogglePlayback).await.unwrap();
    assert_eq!(engine.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn spectrum_follows_station() {
    let mut engine = engine(open_backend());
    assert_eq!(engine.spectrum().seed(), 1);
    engine.switch_to_station(2, false).await.unwrap();
    assert_eq!(engine.spectrum().seed(), 3);
    assert_eq!(
        engine.snapshot().spectrum_base,
        tuner_core::spectrum::base_profile(3, Config::default().spectrum.bars)
    );
}

#[tokio::test(start_paused = true)]
async fn main_audio_ends_and_clears() {
    let mut engine = engine(open_backend().with_duration("audio/salem.mp3", 5.0));
    engine.switch_to_station(0, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(engine.poll());
    assert!(!engine.snapshot().is_playing);
    assert!(main_source(&engine).is_none());
    assert_eq!(engine.sequencer().phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn scrub_before_play_then_play_from_start() {
    let mut engine = engine(open_backend());
    engine.scrub_main(0.5).unwrap();
    let snap = engine.snapshot();
    assert_eq!(snap.position_secs, Some(60.0));
    assert!(!snap.is_playing);
    assert_eq!(engine.playing_count(), 0);

    engine.toggle_main_playback().await.unwrap();
    let snap = engine.snapshot();
    assert!(snap.is_playing);
    assert_eq!(engine.playing_count(), 1);
    assert_eq!(snap.position_secs, Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn unusable_default_length_keeps_polling() {
    let mut engine = engine(ClockBackend::new(-1.0).without_gesture_gate());
    assert!(!engine.poll());
    engine.card_seek("1", 5.0).unwrap();
    assert!(engine.poll());
    assert_eq!(engine.coordinator().cards.get("1").unwrap().position(), 0.0);
    assert!(!engine.poll());
}

#[tokio::test(start_paused = true)]
async fn unknown_targets_are_reported() {
    let mut engine = engine(open_backend());
    assert_eq!(
        engine.switch_to_station(9, true).await,
        Err(TunerError::UnknownStation(9))
    );
    assert_eq!(
        engine.card_toggle("nope").await,
        Err(TunerError::UnknownPlayer("nope".into()))
    );
    assert_eq!(
        engine.narrative_select(70.0),
        Err(TunerError::UnknownFrequency(70.0))
    );
    assert_eq!(engine.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn snapshot_reports_dial_state() {
    let mut engine = engine(open_backend());
    engine.select_preset(2).await.unwrap();
    let snap = engine.snapshot();
    assert_eq!(snap.main_knob_deg, 180.0);
    assert_eq!(snap.home_knob_deg, 180.0);
    assert_eq!(snap.signal_bars_lit, 3);
    assert_eq!(snap.signal_bars_total, 5);
    assert!((snap.dial_percent - (97.8 - 88.1) / (107.9 - 88.1) * 100.0).abs() < 1e-9);
}
