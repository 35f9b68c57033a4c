//! Opaque registry: request identifier to one-shot continuation.
//!
//! Each in-flight command registers a `oneshot::Sender` under its opaque.
//! The continuation fires exactly once: with the matching response, with
//! an explicit cancel, or with *request-canceled* when the session stops
//! and the registry is drained. An entry is removed *before* its sender
//! fires so a waiter may re-register the same opaque from within its
//! continuation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::protocol::Frame;

/// What a registered waiter eventually receives.
#[derive(Debug)]
pub enum Reply {
    /// A response frame arrived. `status` is the translated outcome;
    /// sub-document path-level failures arrive as `Ok` so callers can
    /// inspect per-path status inside the frame.
    Response {
        status: Result<(), Error>,
        frame: Frame,
    },
    /// The command was canceled before a response arrived.
    Canceled(Error),
}

struct Waiter {
    tx: oneshot::Sender<Reply>,
    enqueued_at: Instant,
}

#[derive(Default)]
struct Inner {
    waiters: HashMap<u32, Waiter>,
    closed: bool,
}

/// Thread-safe opaque to continuation mapping.
pub(crate) struct OpaqueRegistry {
    inner: Mutex<Inner>,
}

impl OpaqueRegistry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a waiter under `opaque`.
    ///
    /// Fails once the registry has been drained by session shutdown,
    /// handing the sender back so the caller can fail it synchronously.
    /// A colliding registration cancels the previous waiter; collisions
    /// require a still-pending opaque to survive a full counter wrap.
    pub(crate) fn register(
        &self,
        opaque: u32,
        tx: oneshot::Sender<Reply>,
    ) -> Result<(), oneshot::Sender<Reply>> {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.closed {
            return Err(tx);
        }
        let waiter = Waiter {
            tx,
            enqueued_at: Instant::now(),
        };
        if let Some(previous) = inner.waiters.insert(opaque, waiter) {
            tracing::warn!(opaque, "opaque collision, canceling previous waiter");
            let _ = previous.tx.send(Reply::Canceled(Error::RequestCanceled));
        }
        Ok(())
    }

    /// Remove the waiter for `opaque`, if any, for response delivery.
    pub(crate) fn complete(&self, opaque: u32) -> Option<(oneshot::Sender<Reply>, Instant)> {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        inner
            .waiters
            .remove(&opaque)
            .map(|waiter| (waiter.tx, waiter.enqueued_at))
    }

    /// Remove and fire the waiter for `opaque` with `err`. No-op when the
    /// opaque is not registered.
    pub(crate) fn cancel(&self, opaque: u32, err: Error) -> bool {
        let waiter = {
            let mut inner = self.inner.lock().expect("registry mutex poisoned");
            inner.waiters.remove(&opaque)
        };
        match waiter {
            Some(waiter) => {
                tracing::debug!(opaque, error = %err, "canceling operation");
                let _ = waiter.tx.send(Reply::Canceled(err));
                true
            }
            None => false,
        }
    }

    /// Fire every waiter with *request-canceled* and refuse further
    /// registrations. Called once on session stop.
    pub(crate) fn drain(&self) {
        let waiters = {
            let mut inner = self.inner.lock().expect("registry mutex poisoned");
            inner.closed = true;
            std::mem::take(&mut inner.waiters)
        };
        for (opaque, waiter) in waiters {
            tracing::debug!(opaque, "canceling operation during session close");
            let _ = waiter.tx.send(Reply::Canceled(Error::RequestCanceled));
        }
    }

    /// Number of in-flight registrations.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("registry mutex poisoned").waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_complete() {
        let registry = OpaqueRegistry::new();
        let (tx, mut rx) = oneshot::channel();
        registry.register(7, tx).unwrap();
        assert_eq!(registry.len(), 1);

        let (tx, _) = registry.complete(7).unwrap();
        assert_eq!(registry.len(), 0);
        tx.send(Reply::Canceled(Error::RequestCanceled)).unwrap();
        assert!(matches!(rx.try_recv(), Ok(Reply::Canceled(_))));
    }

    #[test]
    fn complete_unknown_opaque_is_none() {
        let registry = OpaqueRegistry::new();
        assert!(registry.complete(42).is_none());
    }

    #[test]
    fn cancel_fires_with_given_error() {
        let registry = OpaqueRegistry::new();
        let (tx, mut rx) = oneshot::channel();
        registry.register(7, tx).unwrap();

        assert!(registry.cancel(7, Error::UnambiguousTimeout));
        assert!(matches!(
            rx.try_recv(),
            Ok(Reply::Canceled(Error::UnambiguousTimeout))
        ));
    }

    #[test]
    fn cancel_unknown_opaque_is_noop() {
        let registry = OpaqueRegistry::new();
        let (tx, _rx) = oneshot::channel();
        registry.register(7, tx).unwrap();

        assert!(!registry.cancel(8, Error::RequestCanceled));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn drain_fires_everyone_and_closes() {
        let registry = OpaqueRegistry::new();
        let mut receivers = Vec::new();
        for opaque in 0..10 {
            let (tx, rx) = oneshot::channel();
            registry.register(opaque, tx).unwrap();
            receivers.push(rx);
        }

        registry.drain();
        assert_eq!(registry.len(), 0);
        for mut rx in receivers {
            assert!(matches!(
                rx.try_recv(),
                Ok(Reply::Canceled(Error::RequestCanceled))
            ));
        }

        // Further registrations are refused.
        let (tx, _rx) = oneshot::channel();
        assert!(registry.register(99, tx).is_err());
    }

    #[test]
    fn drain_is_idempotent() {
        let registry = OpaqueRegistry::new();
        let (tx, mut rx) = oneshot::channel();
        registry.register(1, tx).unwrap();

        registry.drain();
        registry.drain();

        // Exactly one firing.
        assert!(matches!(rx.try_recv(), Ok(Reply::Canceled(_))));
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn collision_cancels_previous_waiter() {
        let registry = OpaqueRegistry::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        registry.register(5, tx1).unwrap();
        registry.register(5, tx2).unwrap();

        assert!(matches!(rx1.try_recv(), Ok(Reply::Canceled(_))));
        assert_eq!(registry.len(), 1);
    }
}
