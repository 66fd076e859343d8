//! FIFO of pending tones shared between callers and the playback worker.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::{Condvar, Mutex};

use super::{Error, Result, Tone};

/// Unbounded, strictly ordered tone queue.
/// The stop flag is only ever set while holding the queue lock so a worker
/// waiting in [`ToneQueue::take_blocking`] can never miss it.
pub struct ToneQueue {
    tones: Mutex<VecDeque<Tone>>,
    available: Condvar,
    stop: AtomicBool,
}

impl ToneQueue {
    pub fn new() -> Self {
        Self {
            tones: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            stop: AtomicBool::new(false),
        }
    }

    /// Appends all tones in one critical section.
    pub fn enqueue(&self, tones: &[Tone]) -> Result<()> {
        if tones.is_empty() {
            return Err(Error::InvalidArgument("no tones to enqueue"));
        }

        self.tones.lock().extend(tones.iter().copied());
        self.available.notify_all();
        Ok(())
    }

    /// Waits for the next tone.
    /// Returns `None` once a stop has been requested and nothing is left.
    pub fn take_blocking(&self) -> Option<Tone> {
        let mut tones = self.tones.lock();
        loop {
            if let Some(tone) = tones.pop_front() {
                return Some(tone);
            }

            if self.stop.load(Ordering::Acquire) {
                return None;
            }

            self.available.wait(&mut tones);
        }
    }

    #[cfg(test)]
    pub fn try_take(&self) -> Option<Tone> {
        self.tones.lock().pop_front()
    }

    /// Discards everything still queued, returning how many tones were dropped.
    pub fn drain_remaining(&self) -> usize {
        let mut tones = self.tones.lock();
        let count = tones.len();
        tones.clear();
        count
    }

    pub fn request_stop(&self) {
        let _tones = self.tones.lock();
        self.stop.store(true, Ordering::Release);
        self.available.notify_all();
    }

    /// Clears the stop flag for a new session.
    pub fn reset(&self) {
        let _tones = self.tones.lock();
        self.stop.store(false, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.tones.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.lock().is_empty()
    }
}

impl Default for ToneQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use super::ToneQueue;
    use crate::melody::{Error, Tone};

    #[test]
    fn test_fifo_across_calls() {
        let queue = ToneQueue::new();
        queue.enqueue(&[Tone::new(1, 1), Tone::new(2, 1)]).unwrap();
        queue.enqueue(&[Tone::new(3, 1)]).unwrap();

        for i in 1..=3 {
            assert_eq!(queue.try_take(), Some(Tone::new(i, 1)));
        }
        assert_eq!(queue.try_take(), None);
    }

    #[test]
    fn test_reject_empty() {
        let queue = ToneQueue::new();
        assert!(matches!(queue.enqueue(&[]), Err(Error::InvalidArgument(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_blocking_wakes_on_enqueue() {
        let queue = Arc::new(ToneQueue::new());
        let taker = {
            let queue = queue.clone();
            thread::spawn(move || queue.take_blocking())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(&[Tone::new(440, 10)]).unwrap();
        assert_eq!(taker.join().unwrap(), Some(Tone::new(440, 10)));
    }

    #[test]
    fn test_take_blocking_stops_when_empty() {
        let queue = Arc::new(ToneQueue::new());
        let taker = {
            let queue = queue.clone();
            thread::spawn(move || queue.take_blocking())
        };

        thread::sleep(Duration::from_millis(20));
        queue.request_stop();
        assert_eq!(taker.join().unwrap(), None);
    }

    #[test]
    fn test_stop_still_yields_queued() {
        let queue = ToneQueue::new();
        queue.enqueue(&[Tone::new(1, 1), Tone::new(2, 1)]).unwrap();
        queue.request_stop();

        assert_eq!(queue.take_blocking(), Some(Tone::new(1, 1)));
        assert_eq!(queue.take_blocking(), Some(Tone::new(2, 1)));
        assert_eq!(queue.take_blocking(), None);

        queue.reset();
        assert!(!queue.is_stop_requested());
    }

    #[test]
    fn test_drain_remaining() {
        let queue = ToneQueue::new();
        queue.enqueue(&[Tone::new(1, 1); 5]).unwrap();
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.drain_remaining(), 5);
        assert_eq!(queue.drain_remaining(), 0);
    }
}
