use lull::app::{App, AppEvent, Flow};
use lull::audio::{BackendCall, RecordingBackend, RecordingLog};
use lull::catalog::Catalog;
use lull::config::Settings;
use lull::menu::TrayGlyph;
use lull::model::TrackId;

const ID_A: &str = "https://sounds.test/audio/trn_ocean_waves.mp3";
const ID_B: &str = "https://sounds.test/audio/bosexx_rain_on_roof.mp3";
const ID_C: &str = "https://sounds.test/audio/nscp_pink_noise.mp3";

fn app() -> (App, RecordingLog) {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let catalog = Catalog::from_urls([
        ("Naturescapes", vec![ID_A, ID_B]),
        ("Noise Masking", vec![ID_C]),
    ]);
    (App::new(catalog, &Settings::default(), Box::new(backend)), log)
}

fn select(raw: &str) -> AppEvent {
    AppEvent::TrackSelected(TrackId::from(raw))
}

#[test]
fn pause_and_resume_keeps_the_selection() {
    let (mut app, _log) = app();
    app.dispatch(select(ID_B));
    app.dispatch(AppEvent::ToggleRequested);
    assert_eq!(app.menu.glyph, TrayGlyph::Idle);
    app.dispatch(AppEvent::ToggleRequested);

    let state = app.controller.state();
    assert_eq!(state.current_track, Some(TrackId::from(ID_B)));
    assert!(state.is_playing);
    assert_eq!(app.menu.glyph, TrayGlyph::Playing);
    assert_eq!(app.menu.tooltip, "lull - Rain On Roof");
}

#[test]
fn toggle_before_anything_played_does_nothing() {
    let (mut app, log) = app();
    let before = app.menu.clone();

    assert_eq!(app.dispatch(AppEvent::ToggleRequested), Flow::Continue);
    assert_eq!(app.dispatch(AppEvent::ToggleRequested), Flow::Continue);

    let state = app.controller.state();
    assert_eq!(state.current_track, None);
    assert!(!state.is_playing);
    assert!(log.calls().is_empty());
    assert_eq!(app.menu, before);
}

#[test]
fn switching_tracks_releases_the_paused_one_once() {
    let (mut app, log) = app();
    app.dispatch(select(ID_A));
    let first = app.controller.active_session().expect("first session");
    app.dispatch(AppEvent::ToggleRequested);
    app.dispatch(select(ID_C));

    let state = app.controller.state();
    assert_eq!(state.current_track, Some(TrackId::from(ID_C)));
    assert_eq!(state.last_track, Some(TrackId::from(ID_C)));
    assert!(state.is_playing);
    assert_eq!(log.release_count(first), 1);

    let second = app.controller.active_session().expect("second session");
    assert_eq!(log.live_sessions(), vec![second]);

    let calls = log.calls();
    let released = calls
        .iter()
        .position(|call| *call == BackendCall::Release(first))
        .expect("release");
    let opened = calls
        .iter()
        .position(|call| matches!(call, BackendCall::Open { session, .. } if *session == second))
        .expect("open");
    assert!(released < opened);

    let checked: Vec<&str> = app
        .menu
        .checked_entries()
        .iter()
        .map(|entry| entry.id.as_str())
        .collect();
    assert_eq!(checked, vec![ID_C]);
}

#[test]
fn volume_round_trips_while_idle_and_playing() {
    let (mut app, log) = app();
    app.dispatch(AppEvent::VolumeChanged(0.3));
    assert_eq!(app.controller.volume(), 0.3);

    app.dispatch(select(ID_A));
    let session = app.controller.active_session().expect("session");
    assert!(log.calls().contains(&BackendCall::SetVolume(session, 0.3)));

    app.dispatch(AppEvent::VolumeChanged(0.3));
    assert_eq!(app.controller.volume(), 0.3);
    assert_eq!(app.menu.volume().expect("volume").value, 0.3);
}

#[test]
fn stale_end_of_media_is_ignored() {
    let (mut app, log) = app();
    app.dispatch(select(ID_A));
    let stale = app.controller.active_session().expect("session");
    app.dispatch(select(ID_B));
    log.clear();

    app.dispatch(AppEvent::ReachedEnd(stale));

    assert!(log.calls().is_empty());
    assert_eq!(
        app.controller.state().current_track,
        Some(TrackId::from(ID_B))
    );
}

#[test]
fn builtin_catalog_builds_a_menu_with_clean_labels() {
    let app = App::new(
        Catalog::builtin(),
        &Settings::default(),
        Box::new(RecordingBackend::new()),
    );
    assert_eq!(app.menu.track_entries().count(), app.catalog.len());
    for entry in app.menu.track_entries() {
        assert!(!entry.label.is_empty());
        assert!(!entry.label.contains("  "));
        assert!(!entry.label.contains('_'));
    }
}
