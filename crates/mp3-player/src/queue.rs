//! Bounded sample queue between the streaming loop and the device callback.
//!
//! The streaming loop pushes whole blocks and blocks while the queue is full;
//! the real-time callback drains without ever waiting. `close()` makes both
//! sides give up promptly, which is what lets `stop()` unblock a writer that
//! is stuck on a full queue.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::WriteError;

/// Thread-safe bounded queue of interleaved `i16` samples.
///
/// A `done` flag lives under the same mutex as the samples so a close can
/// never race past a waiter.
pub struct BlockQueue {
    channels: usize,
    inner: Mutex<QueueInner>,
    cv: Condvar,
    max_buffered_samples: usize,
}

struct QueueInner {
    queue: VecDeque<i16>,
    done: bool,
}

impl BlockQueue {
    /// Create a queue holding at most `max_buffered_samples` samples (not frames).
    pub fn new(channels: usize, max_buffered_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            inner: Mutex::new(QueueInner {
                queue: VecDeque::with_capacity(max_buffered_samples),
                done: false,
            }),
            cv: Condvar::new(),
            max_buffered_samples: max_buffered_samples.max(channels),
        }
    }

    /// Queue sized for `blocks` blocks of `block_frames` frames each.
    pub fn for_blocks(channels: usize, block_frames: usize, blocks: usize) -> Self {
        let samples = block_frames
            .saturating_mul(blocks.max(1))
            .saturating_mul(channels.max(1));
        Self::new(channels, samples)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Current buffered frames (best-effort snapshot).
    pub fn len_frames(&self) -> usize {
        self.lock().queue.len() / self.channels
    }

    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// Mark the queue finished and wake all waiters. Idempotent.
    pub fn close(&self) {
        let mut g = self.lock();
        g.done = true;
        drop(g);
        self.cv.notify_all();
    }

    /// Push interleaved samples, blocking while the queue is full.
    ///
    /// Returns [`WriteError::Closed`] if the queue is closed before every
    /// sample was accepted; the unaccepted remainder is dropped.
    pub fn push_blocking(&self, samples: &[i16]) -> Result<(), WriteError> {
        let mut offset = 0;

        while offset < samples.len() {
            let mut g = self.lock();

            while g.queue.len() >= self.max_buffered_samples && !g.done {
                g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
            }
            if g.done {
                return Err(WriteError::Closed);
            }

            let room = self.max_buffered_samples - g.queue.len();
            let take = room.min(samples.len() - offset);
            g.queue.extend(&samples[offset..offset + take]);
            offset += take;

            drop(g);
            self.cv.notify_all();
        }

        Ok(())
    }

    /// Move up to `out.len()` whole frames into `out` without blocking.
    ///
    /// Returns the number of samples written. Never waits on the condvar, so
    /// it is safe to call from the device callback.
    pub fn pop_into(&self, out: &mut [i16]) -> usize {
        let mut g = self.lock();
        let want_frames = out.len() / self.channels;
        let take_frames = (g.queue.len() / self.channels).min(want_frames);
        let take = take_frames * self.channels;
        if take == 0 {
            return 0;
        }
        for (slot, sample) in out.iter_mut().zip(g.queue.drain(..take)) {
            *slot = sample;
        }
        drop(g);
        self.cv.notify_all();
        take
    }

    /// Block until the queue is empty, it is closed, or `timeout` elapses.
    ///
    /// Returns `true` only if every queued sample was consumed.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut g = self.lock();
        loop {
            if g.queue.is_empty() {
                return true;
            }
            if g.done {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(Duration::from_millis(50));
            let (ng, _timeout) = self
                .cv
                .wait_timeout(g, wait)
                .unwrap_or_else(PoisonError::into_inner);
            g = ng;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn for_blocks_sizes_in_samples() {
        let q = BlockQueue::for_blocks(2, 512, 4);
        assert_eq!(q.max_buffered_samples, 4096);
        assert_eq!(q.channels(), 2);
    }

    #[test]
    fn pop_into_empty_returns_zero() {
        let q = BlockQueue::new(2, 16);
        let mut out = [0i16; 8];
        assert_eq!(q.pop_into(&mut out), 0);
    }

    #[test]
    fn pop_into_takes_whole_frames_in_order() {
        let q = BlockQueue::new(2, 64);
        q.push_blocking(&[1, 2, 3, 4, 5, 6]).unwrap();

        let mut out = [0i16; 5];
        assert_eq!(q.pop_into(&mut out), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(q.len_frames(), 1);
    }

    #[test]
    fn push_blocks_until_consumer_makes_room() {
        let q = Arc::new(BlockQueue::new(1, 4));
        q.push_blocking(&[1, 2, 3, 4]).unwrap();

        let q_push = q.clone();
        let handle = thread::spawn(move || q_push.push_blocking(&[5, 6]));

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        let mut out = [0i16; 4];
        assert_eq!(q.pop_into(&mut out), 4);
        assert_eq!(handle.join().unwrap(), Ok(()));

        let mut rest = [0i16; 4];
        assert_eq!(q.pop_into(&mut rest), 2);
        assert_eq!(&rest[..2], &[5, 6]);
    }

    #[test]
    fn close_unblocks_a_full_writer() {
        let q = Arc::new(BlockQueue::new(1, 2));
        q.push_blocking(&[1, 2]).unwrap();

        let q_push = q.clone();
        let handle = thread::spawn(move || q_push.push_blocking(&[3]));

        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(handle.join().unwrap(), Err(WriteError::Closed));
        assert!(q.is_done());
    }

    #[test]
    fn push_after_close_is_rejected() {
        let q = BlockQueue::new(2, 8);
        q.close();
        q.close();
        assert_eq!(q.push_blocking(&[1, 2]), Err(WriteError::Closed));
    }

    #[test]
    fn wait_drained_returns_true_once_consumed() {
        let q = Arc::new(BlockQueue::new(1, 8));
        q.push_blocking(&[1, 2, 3]).unwrap();

        let q_pop = q.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let mut out = [0i16; 8];
            q_pop.pop_into(&mut out)
        });

        assert!(q.wait_drained(Duration::from_secs(2)));
        assert_eq!(handle.join().unwrap(), 3);
    }

    #[test]
    fn wait_drained_gives_up_on_close_or_timeout() {
        let q = BlockQueue::new(1, 8);
        q.push_blocking(&[1]).unwrap();
        assert!(!q.wait_drained(Duration::from_millis(10)));
        q.close();
        assert!(!q.wait_drained(Duration::from_secs(5)));
    }
}
