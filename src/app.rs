use crate::audio::{AudioBackend, EndNotifier, NullBackend, RodioBackend, StreamCache};
use crate::catalog::Catalog;
use crate::config::{self, Settings};
use crate::controller::PlaybackController;
use crate::indicator;
use crate::menu::{MenuModel, build_menu};
use crate::model::{SessionId, TrackId};
use crate::tray::{self, FrontEnd, TrayView};
use anyhow::Result;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{info, warn};

/// Everything that can happen to the app, from the menu or from the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    TrackSelected(TrackId),
    VolumeChanged(f32),
    ToggleRequested,
    ReachedEnd(SessionId),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub catalog: Catalog,
    pub controller: PlaybackController,
    pub menu: MenuModel,
    audio: Box<dyn AudioBackend>,
}

impl App {
    pub fn new(catalog: Catalog, settings: &Settings, audio: Box<dyn AudioBackend>) -> Self {
        let controller = PlaybackController::new(settings.initial_volume);
        let mut menu = build_menu(&catalog, controller.volume(), settings.volume_steps);
        indicator::sync(controller.state(), &mut menu);
        Self {
            catalog,
            controller,
            menu,
            audio,
        }
    }

    pub fn output_name(&self) -> String {
        self.audio.output_name()
    }

    /// Apply one event, then bring the menu back in line with the playback state.
    pub fn dispatch(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::TrackSelected(id) => {
                if self.catalog.contains(&id) {
                    self.controller.select_track(&mut *self.audio, id);
                } else {
                    warn!(track = %id, "ignoring selection of unknown track");
                }
            }
            AppEvent::VolumeChanged(volume) => self.controller.set_volume(&mut *self.audio, volume),
            AppEvent::ToggleRequested => self.controller.toggle_playback(&mut *self.audio),
            AppEvent::ReachedEnd(session) => {
                self.controller
                    .handle_reached_end(&mut *self.audio, session);
            }
            AppEvent::Quit => return Flow::Quit,
        }

        indicator::sync(self.controller.state(), &mut self.menu);
        Flow::Continue
    }

    /// Stop playback and let the backend release its resources.
    pub fn shutdown(&mut self) {
        self.controller.stop(&mut *self.audio);
        self.audio.shutdown();
        indicator::sync(self.controller.state(), &mut self.menu);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppStartupOptions {
    pub front_end: FrontEnd,
}

pub fn run_with_startup(options: AppStartupOptions, settings: Settings) -> Result<()> {
    let (events_tx, events_rx) = mpsc::channel::<AppEvent>();

    let audio = open_audio(&settings, events_tx.clone())?;
    let mut app = App::new(Catalog::builtin(), &settings, audio);
    info!(
        tracks = app.catalog.len(),
        output = %app.output_name(),
        "ready"
    );

    let mut view = tray::spawn(options.front_end, &app.menu, events_tx.clone());
    view.show(&app.menu);

    while let Some(event) = next_event(view.as_mut(), &events_rx) {
        if app.dispatch(event) == Flow::Quit {
            break;
        }
        view.show(&app.menu);
    }

    app.shutdown();
    view.close();
    info!("bye");
    Ok(())
}

/// Wait for the next event, pumping the front-end in between when it needs it.
/// `None` once every sender is gone.
fn next_event(view: &mut dyn TrayView, events: &Receiver<AppEvent>) -> Option<AppEvent> {
    loop {
        let Some(interval) = view.pump() else {
            return events.recv().ok();
        };
        match events.recv_timeout(interval) {
            Ok(event) => return Some(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn open_audio(settings: &Settings, events: Sender<AppEvent>) -> Result<Box<dyn AudioBackend>> {
    let cache = StreamCache::new(config::stream_cache_dir(settings)?, settings.stream_cache);
    let notifier: EndNotifier = Box::new(move |session| {
        let _ = events.send(AppEvent::ReachedEnd(session));
    });

    match RodioBackend::new(cache, notifier) {
        Ok(backend) => Ok(Box::new(backend)),
        Err(err) => {
            warn!("audio output unavailable, running silent: {err:#}");
            Ok(Box::new(NullBackend::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BackendCall, RecordingBackend, RecordingLog};
    use crate::menu::{MenuModel, TrayGlyph};
    use std::thread;
    use std::time::Duration;

    /// Front-end that needs pumping, like a menu bar on the main thread.
    struct PumpedView {
        pumps: usize,
        interval: Option<Duration>,
    }

    impl TrayView for PumpedView {
        fn show(&mut self, _menu: &MenuModel) {}

        fn pump(&mut self) -> Option<Duration> {
            self.pumps += 1;
            self.interval
        }
    }

    fn app() -> (App, RecordingLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let catalog = Catalog::from_urls([
            ("Naturescapes", vec!["x/idA.mp3", "x/idB.mp3"]),
            ("Noise Masking", vec!["x/idC.mp3"]),
        ]);
        (App::new(catalog, &Settings::default(), Box::new(backend)), log)
    }

    fn select(raw: &str) -> AppEvent {
        AppEvent::TrackSelected(TrackId::from(raw))
    }

    #[test]
    fn selection_updates_menu() {
        let (mut app, _log) = app();
        assert_eq!(app.dispatch(select("x/idB.mp3")), Flow::Continue);

        assert_eq!(app.menu.glyph, TrayGlyph::Playing);
        let checked: Vec<&str> = app
            .menu
            .checked_entries()
            .iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(checked, vec!["x/idB.mp3"]);
        assert!(app.menu.toggle().expect("toggle").enabled);
    }

    #[test]
    fn unknown_track_is_ignored() {
        let (mut app, log) = app();
        app.dispatch(select("x/not-in-catalog.mp3"));
        assert!(log.calls().is_empty());
        assert_eq!(app.controller.state().current_track, None);
    }

    #[test]
    fn quit_stops_dispatch() {
        let (mut app, _log) = app();
        assert_eq!(app.dispatch(AppEvent::Quit), Flow::Quit);
    }

    #[test]
    fn reached_end_event_loops_the_track() {
        let (mut app, log) = app();
        app.dispatch(select("x/idA.mp3"));
        let session = app.controller.active_session().expect("session");
        log.clear();

        app.dispatch(AppEvent::ReachedEnd(session));

        assert_eq!(
            log.calls(),
            vec![
                BackendCall::Seek(session, Duration::ZERO),
                BackendCall::Play(session)
            ]
        );
        assert!(app.controller.state().is_playing);
    }

    #[test]
    fn volume_event_moves_the_menu_control() {
        let (mut app, _log) = app();
        app.dispatch(AppEvent::VolumeChanged(0.3));
        assert_eq!(app.menu.volume().expect("volume").value, 0.3);
    }

    #[test]
    fn shutdown_releases_the_live_session() {
        let (mut app, log) = app();
        app.dispatch(select("x/idA.mp3"));
        let session = app.controller.active_session().expect("session");

        app.shutdown();

        assert_eq!(log.release_count(session), 1);
        assert!(log.live_sessions().is_empty());
        assert_eq!(app.menu.glyph, TrayGlyph::Idle);
    }

    #[test]
    fn pumped_views_get_turns_while_waiting() {
        let (tx, rx) = mpsc::channel();
        let mut view = PumpedView {
            pumps: 0,
            interval: Some(Duration::from_millis(5)),
        };
        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            tx.send(AppEvent::Quit).expect("send");
        });

        assert_eq!(next_event(&mut view, &rx), Some(AppEvent::Quit));
        sender.join().expect("sender");
        assert!(view.pumps > 1);
        assert_eq!(next_event(&mut view, &rx), None);
    }

    #[test]
    fn unpumped_views_block_on_the_channel() {
        let (tx, rx) = mpsc::channel();
        let mut view = PumpedView {
            pumps: 0,
            interval: None,
        };
        tx.send(AppEvent::ToggleRequested).expect("send");
        drop(tx);

        assert_eq!(next_event(&mut view, &rx), Some(AppEvent::ToggleRequested));
        assert_eq!(next_event(&mut view, &rx), None);
        assert_eq!(view.pumps, 2);
    }
}
