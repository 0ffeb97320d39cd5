//! Store-wide cancellation
//!
//! A store owns one `AbortController`. Every `deferred_once` side effect
//! receives an `AbortSignal` from it and must release whatever it holds
//! (listeners, timers, ports) once the signal fires.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

type AbortListener = Box<dyn FnOnce() + Send>;

struct AbortShared {
    aborted: watch::Sender<bool>,
    listeners: Mutex<Vec<AbortListener>>,
}

/// The owning side of an abort signal
#[derive(Clone)]
pub struct AbortController {
    shared: Arc<AbortShared>,
}

impl AbortController {
    pub fn new() -> Self {
        let (aborted, _) = watch::channel(false);
        Self {
            shared: Arc::new(AbortShared {
                aborted,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get a signal tied to this controller
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            shared: self.shared.clone(),
        }
    }

    /// Fire the signal
    ///
    /// Returns `true` if this call fired it. Listeners run exactly once,
    /// on the first call.
    pub fn abort(&self) -> bool {
        if self.shared.aborted.send_replace(true) {
            return false;
        }
        let listeners = std::mem::take(&mut *self.shared.listeners.lock());
        for listener in listeners {
            listener();
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        *self.shared.aborted.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortController")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// Cloneable read side of an `AbortController`
#[derive(Clone)]
pub struct AbortSignal {
    shared: Arc<AbortShared>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.shared.aborted.borrow()
    }

    /// Wait until the signal fires
    pub async fn aborted(&self) {
        let mut rx = self.shared.aborted.subscribe();
        // The sender lives as long as `shared`, so this only returns once aborted.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    /// Register a listener that runs once when the signal fires
    ///
    /// Runs immediately if the signal has already fired.
    pub fn on_abort(&self, listener: impl FnOnce() + Send + 'static) {
        let mut listeners = self.shared.listeners.lock();
        if self.is_aborted() {
            drop(listeners);
            listener();
        } else {
            listeners.push(Box::new(listener));
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_abort_runs_listeners_once() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        signal.on_abort(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.is_aborted());
        assert!(controller.abort());
        assert!(!controller.abort());
        assert!(signal.is_aborted());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_after_abort_runs_immediately() {
        let controller = AbortController::new();
        controller.abort();

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        controller.signal().on_abort(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aborted_future_resolves() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
            true
        });

        tokio::task::yield_now().await;
        controller.abort();
        assert!(waiter.await.unwrap());
    }
}
