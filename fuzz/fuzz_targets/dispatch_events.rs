#![no_main]

use libfuzzer_sys::fuzz_target;
use lull::app::{App, AppEvent};
use lull::audio::RecordingBackend;
use lull::catalog::Catalog;
use lull::config::Settings;
use lull::model::SessionId;

fuzz_target!(|data: &[u8]| {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut app = App::new(Catalog::builtin(), &Settings::default(), Box::new(backend));
    let ids: Vec<_> = app.catalog.tracks().map(|track| track.id.clone()).collect();

    for pair in data.chunks(2) {
        let arg = pair.get(1).copied().unwrap_or_default();
        let event = match pair[0] % 5 {
            0 => AppEvent::TrackSelected(ids[usize::from(arg) % ids.len()].clone()),
            1 => AppEvent::VolumeChanged(f32::from(arg) / 127.0 - 0.5),
            2 => AppEvent::ToggleRequested,
            3 => AppEvent::ReachedEnd(SessionId(u64::from(arg))),
            _ => AppEvent::ReachedEnd(app.controller.active_session().unwrap_or(SessionId(0))),
        };
        app.dispatch(event);

        assert!(log.live_sessions().len() <= 1);
        assert!((0.0..=1.0).contains(&app.controller.volume()));
        assert!(app.menu.checked_entries().len() <= 1);
    }

    app.shutdown();
    assert!(log.live_sessions().is_empty());
});
