//! Cooperative stop signal shared between the controller and the pipeline worker
//!
//! The controller owns a [`CancelHandle`] (set / reset). Workers only ever get a
//! [`CancelToken`], which can be cloned and polled but never mutated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Controller side of the stop signal
#[derive(Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Stays set until [`CancelHandle::reset`].
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag before the next batch
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Read-only view handed to workers
    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: self.flag.clone(),
        }
    }
}

/// Worker side of the stop signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// A token nobody can cancel, for one-off calls outside a batch
    pub fn never() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observes_handle() {
        let handle = CancelHandle::new();
        let token = handle.token();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());

        handle.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let handle = CancelHandle::new();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.token().is_cancelled());
    }

    #[test]
    fn test_visible_across_threads() {
        let handle = CancelHandle::new();
        let token = handle.token();
        let worker = std::thread::spawn(move || {
            while !token.is_cancelled() {
                std::thread::yield_now();
            }
            true
        });
        handle.cancel();
        assert!(worker.join().unwrap());
    }

    #[test]
    fn test_never_token() {
        assert!(!CancelToken::never().is_cancelled());
    }
}
