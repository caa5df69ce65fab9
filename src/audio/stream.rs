use super::{AudioBackend, EndNotifier, SessionCounter, StreamCache, with_silenced_stderr};
use crate::model::{SessionId, clamp_volume};
use anyhow::{Context, Result, anyhow};
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const END_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum WorkerCmd {
    Open { session: SessionId, url: String },
    Fetched { session: SessionId, path: Result<PathBuf> },
    Play(SessionId),
    Pause(SessionId),
    SetVolume(SessionId, f32),
    Seek(SessionId, Duration),
    Release(SessionId),
    Shutdown,
}

/// rodio-backed playback. A worker thread owns the output stream and one sink per
/// session, and polls sinks for end-of-media. Downloads run on their own threads so
/// no command ever waits on the network.
pub struct RodioBackend {
    tx: Sender<WorkerCmd>,
    sessions: SessionCounter,
    output: String,
    join: Option<JoinHandle<()>>,
}

impl RodioBackend {
    /// Opens the default output device on a worker thread. Fails if no device can be
    /// started, so the caller can fall back to a silent backend.
    pub fn new(cache: StreamCache, notifier: EndNotifier) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WorkerCmd>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, String>>();
        let worker_tx = tx.clone();

        let join = thread::Builder::new()
            .name(String::from("lull-audio"))
            .spawn(move || {
                let stream = match open_output_stream() {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(format!("{err:#}")));
                        return;
                    }
                };
                let output = format!(
                    "System default output ({} ch)",
                    stream.config().channel_count()
                );
                if ready_tx.send(Ok(output)).is_err() {
                    return;
                }
                Worker::new(stream.mixer().clone(), cache, notifier, worker_tx).run(rx);
                drop(stream);
            })
            .context("failed to spawn audio worker")?;

        let output = ready_rx
            .recv()
            .map_err(|_| anyhow!("audio worker exited during startup"))?
            .map_err(|err| anyhow!(err))?;

        Ok(Self {
            tx,
            sessions: SessionCounter::default(),
            output,
            join: Some(join),
        })
    }

    fn send(&self, cmd: WorkerCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("audio worker is gone, dropping command");
        }
    }
}

impl AudioBackend for RodioBackend {
    fn open(&mut self, url: &str) -> SessionId {
        let session = self.sessions.next();
        self.send(WorkerCmd::Open {
            session,
            url: url.to_string(),
        });
        session
    }

    fn play(&mut self, session: SessionId) {
        self.send(WorkerCmd::Play(session));
    }

    fn pause(&mut self, session: SessionId) {
        self.send(WorkerCmd::Pause(session));
    }

    fn set_volume(&mut self, session: SessionId, volume: f32) {
        self.send(WorkerCmd::SetVolume(session, volume));
    }

    fn seek(&mut self, session: SessionId, position: Duration) {
        self.send(WorkerCmd::Seek(session, position));
    }

    fn release(&mut self, session: SessionId) {
        self.send(WorkerCmd::Release(session));
    }

    fn output_name(&self) -> String {
        self.output.clone()
    }

    /// Returns once the worker has stopped its sinks. Downloads still in flight are
    /// cancelled and left to finish on their own threads.
    fn shutdown(&mut self) {
        self.send(WorkerCmd::Shutdown);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            warn!("audio worker panicked");
        }
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.shutdown();
        }
    }
}

fn open_output_stream() -> Result<OutputStream> {
    let mut stream = with_silenced_stderr(|| {
        OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            })
    })?;
    stream.log_on_drop(false);
    Ok(stream)
}

/// Commands that arrive while a session is still downloading.
struct PendingSession {
    playing: bool,
    volume: f32,
    cancel: Arc<AtomicBool>,
}

impl PendingSession {
    fn new() -> Self {
        Self {
            playing: false,
            volume: 1.0,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct WorkerSession {
    sink: Sink,
    path: PathBuf,
    end_reported: bool,
}

struct Worker {
    mixer: Mixer,
    cache: StreamCache,
    notifier: EndNotifier,
    /// Fetch threads report back through the worker's own queue.
    commands: Sender<WorkerCmd>,
    pending: HashMap<SessionId, PendingSession>,
    sessions: HashMap<SessionId, WorkerSession>,
}

impl Worker {
    fn new(
        mixer: Mixer,
        cache: StreamCache,
        notifier: EndNotifier,
        commands: Sender<WorkerCmd>,
    ) -> Self {
        Self {
            mixer,
            cache,
            notifier,
            commands,
            pending: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    fn run(mut self, rx: Receiver<WorkerCmd>) {
        loop {
            match rx.recv_timeout(END_POLL_INTERVAL) {
                Ok(WorkerCmd::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.report_finished();
        }
        self.stop_all();
    }

    fn stop_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.cancel.store(true, Ordering::Relaxed);
        }
        for (_, session) in self.sessions.drain() {
            session.sink.stop();
        }
        if let Err(err) = self.cache.purge() {
            warn!("stream cache cleanup failed: {err:#}");
        }
    }

    fn handle(&mut self, cmd: WorkerCmd) {
        match cmd {
            WorkerCmd::Open { session, url } => self.start_fetch(session, url),
            WorkerCmd::Fetched { session, path } => self.attach(session, path),
            WorkerCmd::Play(session) => {
                if let Some(entry) = self.sessions.get(&session) {
                    entry.sink.play();
                } else if let Some(pending) = self.pending.get_mut(&session) {
                    pending.playing = true;
                }
            }
            WorkerCmd::Pause(session) => {
                if let Some(entry) = self.sessions.get(&session) {
                    entry.sink.pause();
                } else if let Some(pending) = self.pending.get_mut(&session) {
                    pending.playing = false;
                }
            }
            WorkerCmd::SetVolume(session, volume) => {
                let volume = clamp_volume(volume);
                if let Some(entry) = self.sessions.get(&session) {
                    entry.sink.set_volume(volume);
                } else if let Some(pending) = self.pending.get_mut(&session) {
                    pending.volume = volume;
                }
            }
            WorkerCmd::Seek(session, position) => self.seek(session, position),
            WorkerCmd::Release(session) => self.release(session),
            WorkerCmd::Shutdown => {}
        }
    }

    fn start_fetch(&mut self, session: SessionId, url: String) {
        let pending = PendingSession::new();
        let cancel = Arc::clone(&pending.cancel);
        let cache = self.cache.clone();
        let commands = self.commands.clone();

        let spawned = thread::Builder::new()
            .name(format!("lull-fetch-{}", session.0))
            .spawn(move || {
                let path = cache
                    .fetch(&url, &cancel)
                    .with_context(|| format!("could not load {url}"));
                let _ = commands.send(WorkerCmd::Fetched { session, path });
            });
        match spawned {
            Ok(_) => {
                self.pending.insert(session, pending);
            }
            Err(err) => warn!(%session, "failed to start download: {err}"),
        }
    }

    fn attach(&mut self, session: SessionId, path: Result<PathBuf>) {
        let Some(pending) = self.pending.remove(&session) else {
            debug!(%session, "dropping download for released session");
            return;
        };
        let path = match path {
            Ok(path) => path,
            Err(err) => {
                warn!(%session, "{err:#}");
                return;
            }
        };

        match self.load(&path) {
            Ok(sink) => {
                sink.set_volume(pending.volume);
                if pending.playing {
                    sink.play();
                }
                debug!(%session, path = %path.display(), "session opened");
                self.sessions.insert(
                    session,
                    WorkerSession {
                        sink,
                        path,
                        end_reported: false,
                    },
                );
            }
            Err(err) => warn!(%session, "could not open track: {err:#}"),
        }
    }

    fn load(&self, path: &Path) -> Result<Sink> {
        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.append(decode(path, Duration::ZERO)?);
        Ok(sink)
    }

    fn release(&mut self, session: SessionId) {
        if let Some(entry) = self.sessions.remove(&session) {
            entry.sink.stop();
            debug!(%session, "session released");
        } else if let Some(pending) = self.pending.remove(&session) {
            pending.cancel.store(true, Ordering::Relaxed);
            debug!(%session, "download cancelled");
        }
    }

    /// A drained sink has nothing left to seek in, so the track is decoded again from
    /// the cached file and skipped forward instead.
    fn seek(&mut self, session: SessionId, position: Duration) {
        let Some(entry) = self.sessions.get_mut(&session) else {
            return;
        };

        if entry.sink.empty() {
            match decode(&entry.path, position) {
                Ok(source) => entry.sink.append(source),
                Err(err) => {
                    warn!(%session, "could not restart track: {err:#}");
                    return;
                }
            }
        } else if let Err(err) = entry.sink.try_seek(position) {
            warn!(%session, "seek failed: {err:?}");
            return;
        }
        entry.end_reported = false;
    }

    fn report_finished(&mut self) {
        for (session, entry) in &mut self.sessions {
            if entry.end_reported || entry.sink.is_paused() || !entry.sink.empty() {
                continue;
            }
            entry.end_reported = true;
            (self.notifier)(*session);
        }
    }
}

fn decode(path: &Path, start_at: Duration) -> Result<impl Source + Send + 'static> {
    let file =
        File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
    let source =
        Decoder::try_from(file).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(source.skip_duration(start_at))
}
