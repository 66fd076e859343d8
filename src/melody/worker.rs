//! Background thread that plays queued tones.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use super::{queue::ToneQueue, Error, Tone, ToneEmitter};

pub type BoxedEmitter = Box<dyn ToneEmitter>;

/// Lifecycle of one worker. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    /// Spawned, not yet pulling tones.
    Idle,
    /// Playing tones as they arrive.
    Running,
    /// A stop was seen; playing whatever is still queued.
    Draining,
    /// Done. The emitter has been silenced.
    Stopped,
}

impl From<u8> for WorkerState {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        })
    }
}

/// Returned when the thread could not be created.
/// Hands the emitter back so it is not lost with the failed spawn.
pub struct SpawnError {
    pub error: Error,
    pub emitter: BoxedEmitter,
}

/// Handle to a running playback thread.
pub struct Worker {
    session: u64,
    state: Arc<AtomicU8>,
    /// Never receives a value; disconnects when the worker reaches [`WorkerState::Stopped`].
    drained: Receiver<()>,
    handle: JoinHandle<Option<BoxedEmitter>>,
}

impl Worker {
    /// Starts a playback thread for one session.
    /// The emitter is moved in only after the thread exists, and comes back from [`Worker::join`].
    pub fn spawn(
        session: u64,
        queue: Arc<ToneQueue>,
        emitter: BoxedEmitter,
    ) -> Result<Self, SpawnError> {
        let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));
        let (drained_tx, drained_rx) = channel::bounded::<()>(0);
        let (handoff_tx, handoff_rx) = channel::bounded::<BoxedEmitter>(1);

        let handle = {
            let state = state.clone();
            thread::Builder::new()
                .name(format!("melody-worker-{session}"))
                .spawn(move || {
                    let emitter = handoff_rx.recv().ok()?;
                    Some(run(session, &queue, &state, drained_tx, emitter))
                })
        };

        let handle = match handle {
            Ok(i) => i,
            Err(e) => {
                return Err(SpawnError {
                    error: Error::InsufficientResources(format!("worker thread: {e}")),
                    emitter,
                })
            }
        };

        // Capacity of one and the thread is parked on `recv`, so this can't block.
        if let Err(e) = handoff_tx.send(emitter) {
            return Err(SpawnError {
                error: Error::InsufficientResources("worker exited before start".to_owned()),
                emitter: e.into_inner(),
            });
        }

        debug!("Session {session}: worker spawned");
        Ok(Self {
            session,
            state,
            drained: drained_rx,
            handle,
        })
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn state(&self) -> WorkerState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    /// A receiver that unblocks (with a disconnect) once the worker has stopped.
    pub fn drained(&self) -> Receiver<()> {
        self.drained.clone()
    }

    /// Blocks until the worker has stopped.
    pub fn wait_stopped(&self) {
        wait_drained(&self.drained);
    }

    /// Waits for the thread to exit and takes back its emitter.
    /// `None` if the thread panicked.
    pub fn join(self) -> Option<BoxedEmitter> {
        self.wait_stopped();
        match self.handle.join() {
            Ok(emitter) => emitter,
            Err(_) => {
                error!("Session {}: worker panicked, emitter lost", self.session);
                None
            }
        }
    }
}

/// Waits on a drained signal from [`Worker::drained`].
pub fn wait_drained(drained: &Receiver<()>) {
    // Nothing is ever sent, recv only returns on disconnect.
    let _ = drained.recv();
}

fn run(
    session: u64,
    queue: &ToneQueue,
    state: &AtomicU8,
    drained: Sender<()>,
    mut emitter: BoxedEmitter,
) -> BoxedEmitter {
    let set_state = |new: WorkerState| state.store(new as u8, Ordering::Release);
    let get_state = || WorkerState::from(state.load(Ordering::Acquire));

    set_state(WorkerState::Running);
    info!("Session {session}: playback started");

    let start = Instant::now();
    let mut played = 0_usize;
    while let Some(tone) = queue.take_blocking() {
        if get_state() == WorkerState::Running && queue.is_stop_requested() {
            debug!("Session {session}: stop requested, draining {} more", queue.len() + 1);
            set_state(WorkerState::Draining);
        }

        play(session, emitter.as_mut(), tone);
        played += 1;
    }

    if get_state() == WorkerState::Running {
        set_state(WorkerState::Draining);
    }

    if let Err(e) = emitter.silence() {
        warn!("Session {session}: failed to silence output: {e}");
    }

    set_state(WorkerState::Stopped);
    drop(drained);
    info!(
        "Session {session}: stopped after {played} tones ({:.2}s)",
        start.elapsed().as_secs_f32()
    );

    emitter
}

/// Plays one tone to completion.
/// Emitter errors are logged and the hold still happens, keeping later tones on time.
fn play(session: u64, emitter: &mut dyn ToneEmitter, tone: Tone) {
    debug!(
        "Session {session}: {}Hz for {}ms",
        tone.frequency, tone.duration
    );

    let res = match tone.is_rest() {
        true => emitter.silence(),
        false => emitter.activate(tone.frequency),
    };

    if let Err(e) = res {
        warn!("Session {session}: emitter failed on {tone:?}: {e}");
    }

    thread::sleep(tone.hold());
}
