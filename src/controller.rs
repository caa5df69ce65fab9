use crate::audio::AudioBackend;
use crate::model::{PlaybackState, SessionId, TrackId, clamp_volume};
use std::time::Duration;
use tracing::{debug, info};

/// Owns [`PlaybackState`] and the single live audio session.
#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    session: Option<SessionId>,
}

impl PlaybackController {
    pub fn new(initial_volume: f32) -> Self {
        Self {
            state: PlaybackState::with_volume(initial_volume),
            session: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn volume(&self) -> f32 {
        self.state.volume
    }

    /// Replace whatever is playing with `track`, looping until told otherwise.
    /// The previous session is released before the new one is opened.
    pub fn select_track(&mut self, audio: &mut dyn AudioBackend, track: TrackId) {
        self.release_session(audio);

        let session = audio.open(track.as_str());
        audio.set_volume(session, self.state.volume);
        audio.play(session);
        self.session = Some(session);

        info!(track = %track, %session, "playing");
        self.state.current_track = Some(track.clone());
        self.state.last_track = Some(track);
        self.state.is_playing = true;
    }

    /// Store the volume and apply it to the live session, if any.
    pub fn set_volume(&mut self, audio: &mut dyn AudioBackend, volume: f32) {
        self.state.volume = clamp_volume(volume);
        if let Some(session) = self.session {
            audio.set_volume(session, self.state.volume);
        }
        debug!(volume = self.state.volume, "volume changed");
    }

    pub fn toggle_playback(&mut self, audio: &mut dyn AudioBackend) {
        if self.state.is_playing {
            if let Some(session) = self.session {
                audio.pause(session);
            }
            self.state.is_playing = false;
            info!("paused");
            return;
        }

        if let Some(current) = self.state.current_track.clone() {
            match self.session {
                Some(session) => {
                    audio.play(session);
                    self.state.is_playing = true;
                    info!(track = %current, "resumed");
                }
                // Stopped earlier: the session is gone but the track is kept.
                None => self.select_track(audio, current),
            }
            return;
        }

        if let Some(last) = self.state.last_track.clone() {
            self.select_track(audio, last);
        }
    }

    /// Pause and release the live session. The current track is kept so a later
    /// toggle can resume it.
    pub fn stop(&mut self, audio: &mut dyn AudioBackend) {
        self.release_session(audio);
        self.state.is_playing = false;
    }

    /// End-of-media from the backend: rewind the live session and keep playing.
    /// Notifications for sessions that were already replaced are ignored.
    pub fn handle_reached_end(&mut self, audio: &mut dyn AudioBackend, session: SessionId) {
        if self.session != Some(session) {
            debug!(%session, "ignoring end of stale session");
            return;
        }
        audio.seek(session, Duration::ZERO);
        if self.state.is_playing {
            audio.play(session);
        }
    }

    fn release_session(&mut self, audio: &mut dyn AudioBackend) {
        if let Some(session) = self.session.take() {
            audio.pause(session);
            audio.release(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BackendCall, RecordingBackend};
    use proptest::prop_assert;

    fn id(raw: &str) -> TrackId {
        TrackId::from(raw)
    }

    #[test]
    fn select_track_opens_sets_volume_and_plays() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(0.8);

        controller.select_track(&mut audio, id("x/idA.mp3"));

        let session = controller.active_session().expect("live session");
        assert_eq!(
            log.calls(),
            vec![
                BackendCall::Open {
                    session,
                    url: String::from("x/idA.mp3"),
                },
                BackendCall::SetVolume(session, 0.8),
                BackendCall::Play(session),
            ]
        );
        let state = controller.state();
        assert_eq!(state.current_track, Some(id("x/idA.mp3")));
        assert_eq!(state.last_track, Some(id("x/idA.mp3")));
        assert!(state.is_playing);
    }

    #[test]
    fn selecting_again_releases_previous_session_first() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);

        controller.select_track(&mut audio, id("x/idA.mp3"));
        let first = controller.active_session().expect("first session");
        log.clear();
        controller.select_track(&mut audio, id("x/idB.mp3"));
        let second = controller.active_session().expect("second session");

        let calls = log.calls();
        assert_eq!(calls[0], BackendCall::Pause(first));
        assert_eq!(calls[1], BackendCall::Release(first));
        assert!(matches!(calls[2], BackendCall::Open { session, .. } if session == second));
    }

    #[test]
    fn set_volume_without_session_only_updates_state() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);

        controller.set_volume(&mut audio, 0.3);

        assert_eq!(controller.volume(), 0.3);
        assert!(log.calls().is_empty());
    }

    #[test]
    fn set_volume_clamps_and_applies_to_live_session() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        let session = controller.active_session().expect("session");

        controller.set_volume(&mut audio, 4.0);
        assert_eq!(controller.volume(), 1.0);
        controller.set_volume(&mut audio, -1.0);
        assert_eq!(controller.volume(), 0.0);

        let calls = log.calls();
        assert!(calls.ends_with(&[
            BackendCall::SetVolume(session, 1.0),
            BackendCall::SetVolume(session, 0.0),
        ]));
    }

    #[test]
    fn toggle_pauses_and_resumes_same_session() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        let session = controller.active_session().expect("session");
        log.clear();

        controller.toggle_playback(&mut audio);
        assert!(!controller.state().is_playing);
        assert_eq!(controller.state().current_track, Some(id("x/idA.mp3")));

        controller.toggle_playback(&mut audio);
        assert!(controller.state().is_playing);
        assert_eq!(
            log.calls(),
            vec![BackendCall::Pause(session), BackendCall::Play(session)]
        );
    }

    #[test]
    fn toggle_from_fresh_state_is_a_no_op() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);

        controller.toggle_playback(&mut audio);
        controller.toggle_playback(&mut audio);

        assert_eq!(controller.state(), &PlaybackState::default());
        assert!(log.calls().is_empty());
    }

    #[test]
    fn stop_keeps_current_track_and_toggle_reopens_it() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        let first = controller.active_session().expect("session");

        controller.stop(&mut audio);
        assert_eq!(controller.active_session(), None);
        assert!(!controller.state().is_playing);
        assert_eq!(controller.state().current_track, Some(id("x/idA.mp3")));
        assert_eq!(log.release_count(first), 1);

        controller.toggle_playback(&mut audio);
        assert!(controller.state().is_playing);
        let reopened = controller.active_session().expect("reopened session");
        assert_ne!(reopened, first);
        assert_eq!(log.opened().last().map(|(_, url)| url.as_str()), Some("x/idA.mp3"));
    }

    #[test]
    fn toggle_falls_back_to_last_track_when_current_is_gone() {
        let mut audio = RecordingBackend::new();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        controller.stop(&mut audio);
        controller.state.current_track = None;

        controller.toggle_playback(&mut audio);

        assert_eq!(controller.state().current_track, Some(id("x/idA.mp3")));
        assert!(controller.state().is_playing);
    }

    #[test]
    fn reached_end_rewinds_only_the_live_session() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        let stale = controller.active_session().expect("first");
        controller.select_track(&mut audio, id("x/idB.mp3"));
        let live = controller.active_session().expect("second");
        log.clear();

        controller.handle_reached_end(&mut audio, stale);
        assert!(log.calls().is_empty());

        controller.handle_reached_end(&mut audio, live);
        assert_eq!(
            log.calls(),
            vec![BackendCall::Seek(live, Duration::ZERO), BackendCall::Play(live)]
        );
        assert!(controller.state().is_playing);
    }

    #[test]
    fn reached_end_while_paused_rewinds_without_playing() {
        let mut audio = RecordingBackend::new();
        let log = audio.log();
        let mut controller = PlaybackController::new(1.0);
        controller.select_track(&mut audio, id("x/idA.mp3"));
        let live = controller.active_session().expect("session");
        controller.toggle_playback(&mut audio);
        log.clear();

        controller.handle_reached_end(&mut audio, live);
        assert_eq!(log.calls(), vec![BackendCall::Seek(live, Duration::ZERO)]);
    }

    proptest::proptest! {
        #[test]
        fn at_most_one_session_is_ever_live(ops in proptest::collection::vec(0u8..6, 1..120)) {
            let tracks = [id("x/idA.mp3"), id("x/idB.mp3"), id("x/idC.mp3")];
            let mut audio = RecordingBackend::new();
            let log = audio.log();
            let mut controller = PlaybackController::new(1.0);

            for (step, op) in ops.into_iter().enumerate() {
                match op {
                    0..=2 => controller.select_track(&mut audio, tracks[usize::from(op)].clone()),
                    3 => controller.toggle_playback(&mut audio),
                    4 => controller.stop(&mut audio),
                    _ => controller.set_volume(&mut audio, (step % 11) as f32 / 10.0),
                }

                let state = controller.state();
                prop_assert!(log.live_sessions().len() <= 1);
                prop_assert!(state.current_track.is_some() || !state.is_playing);
                prop_assert!((0.0..=1.0).contains(&state.volume));
                prop_assert!(state.current_track.is_none() || state.last_track.is_some());
            }
        }
    }
}
