//! One-shot promise/future pair built on a bounded(1) crossbeam channel.
//!
//! A `Promise` is fulfilled exactly once: explicitly via `fulfill`, or with
//! `T::default()` when dropped unfulfilled (cancellation, shutdown, a request
//! dropped with its queue). A `MediaFuture` therefore never hangs.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use std::time::Duration;

pub struct Promise<T: Default> {
    tx: Option<Sender<T>>,
}

pub struct MediaFuture<T> {
    rx: Receiver<T>,
    value: Option<T>,
}

/// Create a connected promise/future pair.
pub fn promise<T: Default>() -> (Promise<T>, MediaFuture<T>) {
    let (tx, rx) = bounded(1);
    (Promise { tx: Some(tx) }, MediaFuture { rx, value: None })
}

impl<T: Default> Promise<T> {
    pub fn fulfill(mut self, value: T) {
        if let Some(tx) = self.tx.take() {
            // Receiver may be gone; the caller dropped its future.
            let _ = tx.send(value);
        }
    }

    /// Fulfill with the default value.
    pub fn fulfill_default(self) {
        self.fulfill(T::default());
    }
}

impl<T: Default> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(T::default());
        }
    }
}

impl<T: Default> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("fulfilled", &self.tx.is_none())
            .finish()
    }
}

impl<T: Default> MediaFuture<T> {
    /// Non-blocking readiness check.
    pub fn is_ready(&mut self) -> bool {
        if self.value.is_none() {
            match self.rx.try_recv() {
                Ok(v) => self.value = Some(v),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => self.value = Some(T::default()),
            }
        }
        true
    }

    /// Wait up to `timeout`; true once the value is available.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        if self.value.is_some() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(v) => {
                self.value = Some(v);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.value = Some(T::default());
                true
            }
        }
    }

    /// Block until the value is available.
    pub fn wait(mut self) -> T {
        if let Some(v) = self.value.take() {
            return v;
        }
        self.rx.recv().unwrap_or_default()
    }

    /// Take the value if ready.
    pub fn try_take(&mut self) -> Option<T> {
        if self.is_ready() { self.value.take() } else { None }
    }
}

impl<T> std::fmt::Debug for MediaFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFuture")
            .field("ready", &(self.value.is_some() || !self.rx.is_empty()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfill_then_wait() {
        let (p, f) = promise::<u32>();
        p.fulfill(7);
        assert_eq!(f.wait(), 7);
    }

    #[test]
    fn test_drop_fulfills_default() {
        let (p, mut f) = promise::<String>();
        assert!(!f.is_ready());
        drop(p);
        assert!(f.is_ready());
        assert_eq!(f.wait(), "");
    }

    #[test]
    fn test_wait_timeout() {
        let (p, mut f) = promise::<u32>();
        assert!(!f.wait_timeout(Duration::from_millis(5)));
        let t = std::thread::spawn(move || p.fulfill(3));
        assert!(f.wait_timeout(Duration::from_secs(5)));
        t.join().unwrap();
        assert_eq!(f.try_take(), Some(3));
    }

    #[test]
    fn test_fulfill_after_future_dropped() {
        let (p, f) = promise::<u32>();
        drop(f);
        p.fulfill(1);
    }
}
