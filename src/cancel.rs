//! Cancellation primitives for in-flight requests.
//!
//! Every request owns its own [`CancelHandle`]; cancelling one never affects
//! another. Cancellation is cooperative: the dispatcher races the transport
//! call against the handle's token and drops the in-flight call when the
//! handle fires, so the underlying HTTP connection is aborted rather than
//! merely ignored.

use crate::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

type CancelCallback = Box<dyn FnOnce() + Send>;

struct CancelInner {
    flag: AtomicBool,
    token: CancellationToken,
    callbacks: Mutex<Vec<CancelCallback>>,
}

/// A handle that can be used to request cancellation of one request.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                token: CancellationToken::new(),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Request cancellation. Registered cleanups run exactly once, in
    /// registration order; subsequent calls are no-ops.
    pub fn cancel(&self) {
        let callbacks = {
            let mut guard = self.inner.callbacks.lock().unwrap();
            if self.inner.flag.swap(true, Ordering::SeqCst) {
                return;
            }
            guard.drain(..).collect::<Vec<_>>()
        };
        for callback in callbacks {
            callback();
        }
        self.inner.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Register a cleanup to run when `cancel()` is called. If the handle is
    /// already cancelled, the cleanup runs immediately.
    pub fn on_cancel<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut guard = self.inner.callbacks.lock().unwrap();
            if !self.inner.flag.load(Ordering::SeqCst) {
                guard.push(Box::new(f));
                return;
            }
        }
        f();
    }

    /// Future that completes when the handle is cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Completion side of a [`CancelableRequest`].
///
/// Resolving or rejecting after the handle was cancelled is a no-op: no
/// observer ever sees a value for a cancelled request.
pub struct RequestSlot<T> {
    tx: oneshot::Sender<Result<T, Error>>,
    handle: CancelHandle,
}

impl<T> RequestSlot<T> {
    /// Settle the request with a value. No-op when already cancelled.
    pub fn resolve(self, value: T) {
        if !self.handle.is_cancelled() {
            let _ = self.tx.send(Ok(value));
        }
    }

    /// Settle the request with an error. No-op when already cancelled.
    pub fn reject(self, error: Error) {
        if !self.handle.is_cancelled() {
            let _ = self.tx.send(Err(error));
        }
    }

    /// Cancellation flag, readable by the executor while it runs.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// The handle shared with the consumer side.
    pub fn handle(&self) -> CancelHandle {
        self.handle.clone()
    }
}

/// A promise-like unit of work with an attached cancellation channel.
///
/// Awaiting a cancelled request yields [`Error::Cancelled`] regardless of any
/// late settlement attempt on the slot.
pub struct CancelableRequest<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
    handle: CancelHandle,
    cancelled: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl<T> CancelableRequest<T> {
    /// Create a request/slot pair with a fresh cancel handle.
    pub fn channel() -> (Self, RequestSlot<T>) {
        Self::with_handle(CancelHandle::new())
    }

    /// Create a request/slot pair bound to an existing handle.
    pub fn with_handle(handle: CancelHandle) -> (Self, RequestSlot<T>) {
        let (tx, rx) = oneshot::channel();
        let waiter = handle.clone();
        let request = Self {
            rx,
            handle: handle.clone(),
            cancelled: Box::pin(async move { waiter.cancelled().await }),
        };
        (request, RequestSlot { tx, handle })
    }

    /// The cancellation handle for this request.
    pub fn handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Cancel the request.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

impl<T> Future for CancelableRequest<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(Error::Cancelled));
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Slot dropped without settling; distinguish cancellation from a
            // vanished executor.
            Poll::Ready(Err(_)) => {
                if self.handle.is_cancelled() {
                    Poll::Ready(Err(Error::Cancelled))
                } else {
                    Poll::Ready(Err(Error::Transport("request slot dropped".into())))
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn callbacks_run_once_in_registration_order() {
        let handle = CancelHandle::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            handle.on_cancel(move || order.lock().unwrap().push(i));
        }
        handle.cancel();
        handle.cancel();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn late_registration_fires_immediately() {
        let handle = CancelHandle::new();
        handle.cancel();

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        handle.on_cancel(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_is_terminal() {
        let (request, slot) = CancelableRequest::<u32>::channel();
        request.cancel();

        // Late resolution must not change the observed state.
        slot.resolve(42);

        let outcome = request.await;
        assert!(matches!(outcome, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn resolve_before_cancel_delivers_value() {
        let (request, slot) = CancelableRequest::<u32>::channel();
        slot.resolve(7);
        assert_eq!(request.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn reject_delivers_error() {
        let (request, slot) = CancelableRequest::<u32>::channel();
        slot.reject(Error::Transport("boom".into()));
        assert!(matches!(request.await, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn cancel_wakes_pending_await() {
        let (request, _slot) = CancelableRequest::<u32>::channel();
        let handle = request.handle();

        let waiter = tokio::spawn(request);
        tokio::task::yield_now().await;
        handle.cancel();

        let outcome = waiter.await.unwrap();
        assert!(matches!(outcome, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn independent_handles_do_not_interfere() {
        let (a, slot_a) = CancelableRequest::<u32>::channel();
        let (b, _slot_b) = CancelableRequest::<u32>::channel();

        b.cancel();
        slot_a.resolve(1);

        assert_eq!(a.await.unwrap(), 1);
        assert!(matches!(b.await, Err(Error::Cancelled)));
    }

    #[test]
    fn counter_callbacks_observe_single_invocation() {
        let handle = CancelHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        handle.on_cancel(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        handle.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
