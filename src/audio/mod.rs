mod cache;
mod recording;
mod stream;

pub use cache::StreamCache;
pub use recording::{BackendCall, RecordingBackend, RecordingLog};
pub use stream::RodioBackend;

use crate::model::SessionId;
use std::collections::HashSet;
use std::time::Duration;

/// Callback the backend uses to report that a session reached the end of its media.
pub type EndNotifier = Box<dyn Fn(SessionId) + Send + 'static>;

/// Playback engine behind the controller. Every call returns immediately; loading and
/// streaming happen out of band, and failures are the backend's to log.
pub trait AudioBackend {
    /// Start loading `url` into a new, paused session.
    fn open(&mut self, url: &str) -> SessionId;
    fn play(&mut self, session: SessionId);
    fn pause(&mut self, session: SessionId);
    fn set_volume(&mut self, session: SessionId, volume: f32);
    fn seek(&mut self, session: SessionId, position: Duration);
    /// Stop the session and free everything it holds. Unknown sessions are ignored.
    fn release(&mut self, session: SessionId);
    fn output_name(&self) -> String;
    /// Release every session and stop any worker. Called once before exit.
    fn shutdown(&mut self) {}
}

/// Session ids are handed out in increasing order, starting at 1.
#[derive(Debug, Default)]
pub(crate) struct SessionCounter {
    last: u64,
}

impl SessionCounter {
    pub(crate) fn next(&mut self) -> SessionId {
        self.last = self.last.saturating_add(1);
        SessionId(self.last)
    }
}

/// Backend used when no audio output can be opened. It accepts every command and
/// never reports end-of-media.
#[derive(Debug, Default)]
pub struct NullBackend {
    sessions: SessionCounter,
    open: HashSet<SessionId>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn open_sessions(&self) -> usize {
        self.open.len()
    }
}

impl AudioBackend for NullBackend {
    fn open(&mut self, _url: &str) -> SessionId {
        let session = self.sessions.next();
        self.open.insert(session);
        session
    }

    fn play(&mut self, _session: SessionId) {}

    fn pause(&mut self, _session: SessionId) {}

    fn set_volume(&mut self, _session: SessionId, _volume: f32) {}

    fn seek(&mut self, _session: SessionId, _position: Duration) {}

    fn release(&mut self, session: SessionId) {
        self.open.remove(&session);
    }

    fn output_name(&self) -> String {
        String::from("Null audio backend")
    }

    fn shutdown(&mut self) {
        self.open.clear();
    }
}

#[cfg(unix)]
pub(crate) fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    use std::ffi::CString;

    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
pub(crate) fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}
