//! Session lifecycle: start, stop, and wait-on-close.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::{
    queue::ToneQueue,
    worker::{self, BoxedEmitter, SpawnError, Worker, WorkerState},
    Error, Result, Tone, ToneEmitter,
};

/// Owns the tone queue and at most one playback worker.
pub struct Controller {
    queue: Arc<ToneQueue>,
    wait_on_close: AtomicBool,
    next_session: AtomicU64,

    /// Serializes `start`, which may block waiting for the previous worker.
    start_gate: Mutex<()>,
    /// Bookkeeping only, never held across a wait.
    slot: Mutex<Slot>,
}

struct Slot {
    worker: Option<Worker>,
    /// Parked here while no worker holds it.
    emitter: Option<BoxedEmitter>,
}

impl Controller {
    pub fn new(emitter: impl ToneEmitter + 'static) -> Self {
        Self {
            queue: Arc::new(ToneQueue::new()),
            wait_on_close: AtomicBool::new(false),
            next_session: AtomicU64::new(1),
            start_gate: Mutex::new(()),
            slot: Mutex::new(Slot {
                worker: None,
                emitter: Some(Box::new(emitter)),
            }),
        }
    }

    /// Starts a new playback session.
    /// If the previous worker hasn't stopped yet this waits for it first.
    pub fn start(&self) -> Result<()> {
        let _gate = self.start_gate.lock();

        let prior = self.slot.lock().worker.as_ref().map(|w| {
            if !w.is_stopped() && !self.queue.is_stop_requested() {
                warn!(
                    "Session {} was never closed, waiting for it anyway",
                    w.session()
                );
            }
            (w.session(), w.drained())
        });

        if let Some((session, drained)) = prior {
            debug!("Waiting for session {session} to stop");
            worker::wait_drained(&drained);

            let worker = self.slot.lock().worker.take();
            if let Some(emitter) = worker.and_then(Worker::join) {
                self.slot.lock().emitter = Some(emitter);
            }
        }

        // Clearing the stop flag and installing the worker happen under one slot lock,
        // the same lock `stop` raises the flag under, so a close can't fall between them.
        let mut slot = self.slot.lock();
        let stale = self.queue.drain_remaining();
        if stale > 0 {
            warn!("Discarding {stale} tones queued outside of a session");
        }
        self.queue.reset();

        let emitter = slot.emitter.take().ok_or_else(|| {
            Error::InsufficientResources("no tone emitter available".to_owned())
        })?;

        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        match Worker::spawn(session, self.queue.clone(), emitter) {
            Ok(worker) => {
                info!("Session {session} opened");
                slot.worker = Some(worker);
                Ok(())
            }
            Err(SpawnError { error, emitter }) => {
                error!("Session {session} failed to start: {error}");
                slot.emitter = Some(emitter);
                Err(error)
            }
        }
    }

    pub fn enqueue_tones(&self, tones: &[Tone]) -> Result<()> {
        self.queue.enqueue(tones)?;
        debug!("Queued {} tones ({} pending)", tones.len(), self.queue.len());
        Ok(())
    }

    /// Read by the next [`Controller::stop`].
    pub fn set_wait_on_close(&self, wait: bool) {
        self.wait_on_close.store(wait, Ordering::Release);
    }

    pub fn wait_on_close(&self) -> bool {
        self.wait_on_close.load(Ordering::Acquire)
    }

    /// Asks the worker to finish.
    /// With wait-on-close set this blocks until every queued tone has played.
    pub fn stop(&self) {
        let wait = self.wait_on_close();
        let current = {
            let slot = self.slot.lock();
            self.queue.request_stop();
            slot.worker.as_ref().map(|w| (w.session(), w.drained()))
        };

        let Some((session, drained)) = current else {
            debug!("Stop with no open session");
            return;
        };

        if !wait {
            if !self.queue.is_empty() {
                debug!(
                    "Session {session} closing in the background, {} tones still to play",
                    self.queue.len()
                );
            }
            return;
        }

        info!(
            "Session {session} closing, waiting on {} queued tones",
            self.queue.len()
        );
        worker::wait_drained(&drained);
        info!("Session {session} drained");
    }

    /// Teardown: drops queued tones, lets the current one finish and joins the worker.
    pub fn shutdown(&self) {
        let _gate = self.start_gate.lock();
        self.queue.request_stop();

        let discarded = self.queue.drain_remaining();
        if discarded > 0 {
            info!("Discarded {discarded} queued tones on shutdown");
        }

        let worker = self.slot.lock().worker.take();
        if let Some(emitter) = worker.and_then(Worker::join) {
            self.slot.lock().emitter = Some(emitter);
        }
    }

    /// State of the current (or last) worker, `None` before the first session.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.slot.lock().worker.as_ref().map(Worker::state)
    }

    pub fn session_id(&self) -> Option<u64> {
        self.slot.lock().worker.as_ref().map(Worker::session)
    }

    /// Number of tones waiting to be played.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
