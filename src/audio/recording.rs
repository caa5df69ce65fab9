//! In-memory backend that records every call. Used by tests and the fuzz target to
//! check call ordering without an audio device.

use super::{AudioBackend, SessionCounter};
use crate::model::SessionId;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Open { session: SessionId, url: String },
    Play(SessionId),
    Pause(SessionId),
    SetVolume(SessionId, f32),
    Seek(SessionId, Duration),
    Release(SessionId),
}

/// Shared view of the calls made on a [`RecordingBackend`], still readable after the
/// backend has been boxed and handed to the app.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    calls: Rc<RefCell<Vec<BackendCall>>>,
}

impl RecordingLog {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn push(&self, call: BackendCall) {
        self.calls.borrow_mut().push(call);
    }

    pub fn opened(&self) -> Vec<(SessionId, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Open { session, url } => Some((*session, url.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self, session: SessionId) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| **call == BackendCall::Release(session))
            .count()
    }

    /// Sessions opened and not yet released.
    pub fn live_sessions(&self) -> Vec<SessionId> {
        let mut live = Vec::new();
        for call in self.calls.borrow().iter() {
            match call {
                BackendCall::Open { session, .. } => live.push(*session),
                BackendCall::Release(session) => live.retain(|open| open != session),
                _ => {}
            }
        }
        live
    }
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    sessions: SessionCounter,
    log: RecordingLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }
}

impl AudioBackend for RecordingBackend {
    fn open(&mut self, url: &str) -> SessionId {
        let session = self.sessions.next();
        self.log.push(BackendCall::Open {
            session,
            url: url.to_string(),
        });
        session
    }

    fn play(&mut self, session: SessionId) {
        self.log.push(BackendCall::Play(session));
    }

    fn pause(&mut self, session: SessionId) {
        self.log.push(BackendCall::Pause(session));
    }

    fn set_volume(&mut self, session: SessionId, volume: f32) {
        self.log.push(BackendCall::SetVolume(session, volume));
    }

    fn seek(&mut self, session: SessionId, position: Duration) {
        self.log.push(BackendCall::Seek(session, position));
    }

    fn release(&mut self, session: SessionId) {
        self.log.push(BackendCall::Release(session));
    }

    fn output_name(&self) -> String {
        String::from("Recording backend")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_survives_boxing_the_backend() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut boxed: Box<dyn AudioBackend> = Box::new(backend);

        let session = boxed.open("x/a.mp3");
        boxed.play(session);
        boxed.release(session);

        assert_eq!(
            log.calls(),
            vec![
                BackendCall::Open {
                    session,
                    url: String::from("x/a.mp3"),
                },
                BackendCall::Play(session),
                BackendCall::Release(session),
            ]
        );
        assert!(log.live_sessions().is_empty());
        assert_eq!(log.release_count(session), 1);
    }
}
