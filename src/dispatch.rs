//! Background speech dispatch for non-blocking front-ends.
//!
//! A [`Dispatcher`] owns one worker thread fed through a single-slot channel.
//! Only one request may be in flight: submitting while busy is rejected with
//! [`DispatchError::Busy`] instead of being queued. Results come back as
//! [`DispatchEvent`]s that the interactive thread polls.
//!
//! The worker only consumes text and playback parameters. It never sees the
//! navigator or the preferences.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{PlaybackParams, SpeechEngine, SpeechError};

pub type RequestId = u64;

#[derive(Debug)]
pub enum DispatchEvent {
    /// The worker picked the request up and playback began.
    Started(RequestId),
    Completed(RequestId),
    /// Playback ended after a stop request.
    Stopped(RequestId),
    Failed { id: RequestId, error: SpeechError },
}

impl DispatchEvent {
    pub fn id(&self) -> RequestId {
        match self {
            DispatchEvent::Started(id)
            | DispatchEvent::Completed(id)
            | DispatchEvent::Stopped(id)
            | DispatchEvent::Failed { id, .. } => *id,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("speech is already in progress; wait for it to finish or stop it")]
    Busy,
    #[error("speech worker has shut down")]
    Disconnected,
    #[error("failed to start speech worker: {0}")]
    Spawn(#[source] io::Error),
}

struct SpeechJob {
    id: RequestId,
    text: String,
    params: PlaybackParams,
}

/// Flags shared by the dispatcher handle and its worker.
#[derive(Default)]
struct WorkerState {
    /// Set by `submit`, cleared by the worker once the request is finished.
    busy: AtomicBool,
    /// Set by `stop`; the worker consumes it when choosing Completed vs Stopped.
    cancel: AtomicBool,
}

struct Worker {
    engine: Arc<dyn SpeechEngine>,
    requests: Receiver<SpeechJob>,
    events: Sender<DispatchEvent>,
    state: Arc<WorkerState>,
}

impl Worker {
    fn run(self) {
        for job in self.requests.iter() {
            let event = if self.state.cancel.swap(false, Ordering::SeqCst) {
                log::debug!("speech request {} stopped before playback", job.id);
                DispatchEvent::Stopped(job.id)
            } else {
                log::debug!("speech request {} started", job.id);
                if self.events.send(DispatchEvent::Started(job.id)).is_err() {
                    break;
                }
                self.play(job)
            };

            // Clear busy before reporting, so a front-end reacting to the
            // event can submit again straight away.
            self.state.busy.store(false, Ordering::SeqCst);
            if self.events.send(event).is_err() {
                break;
            }
        }
        log::debug!("speech worker exiting");
    }

    fn play(&self, job: SpeechJob) -> DispatchEvent {
        let result = self.engine.speak(&job.text, &job.params);
        let cancelled = self.state.cancel.swap(false, Ordering::SeqCst);
        match result {
            _ if cancelled => DispatchEvent::Stopped(job.id),
            Ok(()) => DispatchEvent::Completed(job.id),
            Err(error) => {
                log::warn!("speech request {} failed: {error}", job.id);
                DispatchEvent::Failed { id: job.id, error }
            }
        }
    }
}

/// Handle to the speech worker thread.
pub struct Dispatcher {
    engine: Arc<dyn SpeechEngine>,
    requests: Option<SyncSender<SpeechJob>>,
    events: Receiver<DispatchEvent>,
    state: Arc<WorkerState>,
    next_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the worker thread.
    pub fn spawn(engine: Arc<dyn SpeechEngine>) -> Result<Self, DispatchError> {
        let (request_tx, request_rx) = mpsc::sync_channel(1);
        let (event_tx, event_rx) = mpsc::channel();
        let state = Arc::new(WorkerState::default());

        let worker = Worker {
            engine: Arc::clone(&engine),
            requests: request_rx,
            events: event_tx,
            state: Arc::clone(&state),
        };
        let handle = thread::Builder::new()
            .name("speech-worker".to_string())
            .spawn(move || worker.run())
            .map_err(DispatchError::Spawn)?;

        Ok(Self {
            engine,
            requests: Some(request_tx),
            events: event_rx,
            state,
            next_id: AtomicU64::new(1),
            worker: Some(handle),
        })
    }

    /// Queue `text` for playback. Fails with `Busy` while another request is
    /// in flight.
    pub fn submit(
        &self,
        text: impl Into<String>,
        params: PlaybackParams,
    ) -> Result<RequestId, DispatchError> {
        if self
            .state
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DispatchError::Busy);
        }
        self.state.cancel.store(false, Ordering::SeqCst);
        self.engine.clear_stop();

        let Some(requests) = &self.requests else {
            self.state.busy.store(false, Ordering::SeqCst);
            return Err(DispatchError::Disconnected);
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = SpeechJob {
            id,
            text: text.into(),
            params,
        };
        match requests.try_send(job) {
            Ok(()) => Ok(id),
            Err(TrySendError::Full(_)) => {
                self.state.busy.store(false, Ordering::SeqCst);
                Err(DispatchError::Busy)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.state.busy.store(false, Ordering::SeqCst);
                Err(DispatchError::Disconnected)
            }
        }
    }

    /// Ask the in-flight playback to stop, including one the worker has not
    /// started yet. No-op when idle.
    pub fn stop(&self) -> Result<(), SpeechError> {
        if !self.is_busy() {
            return Ok(());
        }
        self.state.cancel.store(true, Ordering::SeqCst);
        self.engine.stop()
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::SeqCst)
    }

    /// Next pending event, without blocking.
    pub fn try_event(&self) -> Option<DispatchEvent> {
        self.events.try_recv().ok()
    }

    /// Next event, waiting up to `timeout`.
    pub fn wait_event(&self, timeout: Duration) -> Option<DispatchEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.requests.take();
        if self.is_busy() {
            let _ = self.stop();
        }
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("speech worker panicked");
            }
        }
    }
}
