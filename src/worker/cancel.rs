//! Broadcast cancellation shared by workers, the reporter and signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{bounded, Receiver, Sender};

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    /// Dropped on cancel, which disconnects `signal`
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

/// A cloneable cancellation token.
///
/// `cancel` may be called any number of times from any thread; only the
/// first call has an effect.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Requests cancellation. Returns `true` for the call that flipped the token.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    /// Non-blocking check, cheap enough to poll on every iteration.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Receiver that becomes ready (disconnected) once the token is cancelled.
    ///
    /// Meant for `crossbeam_channel::select!`.
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{select, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(!token.clone().cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_signal_wakes_waiters() {
        let token = CancelToken::new();
        assert_eq!(
            token.cancelled().recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );

        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
            remote.cancel();
        });

        select! {
            recv(token.cancelled()) -> _ => {}
            default(Duration::from_secs(5)) => panic!("cancellation was not observed"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_cancel() {
        let token = CancelToken::new();
        let winners: usize = (0..8)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || token.cancel())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
        assert!(token.is_cancelled());
    }
}
