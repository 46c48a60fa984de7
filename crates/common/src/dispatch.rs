//! Bridge from blocking RPC calls to the async caller surface.
//!
//! The underlying store stubs block the thread they run on. Every SDK
//! operation routes through [`dispatch_blocking`], which schedules the call
//! on the runtime's blocking worker pool and resolves on the caller's
//! context with exactly one outcome. A panic inside the blocking closure is
//! captured and surfaced as a `Transport` fault, never an unwind.
//!
//! Cancellation: once dispatched, an in-flight blocking call cannot be
//! preempted. Dropping the returned future discards the result when it
//! arrives; it does not reclaim the worker early.

use quillpad_domain::{QuillpadError, Result};

/// Run `op` on the blocking worker pool and resolve with its result.
///
/// # Errors
/// Whatever `op` returns, or `Transport` when the worker faulted (panic or
/// runtime shutdown) before producing a result.
pub async fn dispatch_blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| QuillpadError::Transport(format!("dispatch worker failed: {e}")))?
}

#[cfg(test)]
mod tests {
    //! Unit tests for the dispatch bridge.
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Validates `dispatch_blocking` behavior for the success delivery
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the result is delivered exactly once.
    /// - Ensures the closure ran off the caller's thread.
    #[tokio::test]
    async fn delivers_success_exactly_once() {
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&deliveries);
        let caller_thread = std::thread::current().id();

        let value = dispatch_blocking(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_ne!(std::thread::current().id(), caller_thread);
            Ok(41 + 1)
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    /// Validates `dispatch_blocking` behavior for the failure delivery
    /// scenario.
    #[tokio::test]
    async fn delivers_failure_exactly_once() {
        let result: Result<()> = dispatch_blocking(|| {
            Err(QuillpadError::Transport("connection refused".into()))
        })
        .await;

        assert!(matches!(result, Err(QuillpadError::Transport(_))));
    }

    /// Validates `dispatch_blocking` behavior for the panic capture
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a panicking operation resolves to a `Transport` fault
    ///   rather than unwinding into the caller.
    #[tokio::test]
    async fn captures_panic_as_transport_fault() {
        let result: Result<()> = dispatch_blocking(|| panic!("stub blew up")).await;

        match result {
            Err(QuillpadError::Transport(msg)) => {
                assert!(msg.contains("dispatch worker failed"));
            }
            other => panic!("expected transport fault, got {other:?}"),
        }
    }

    /// A discarded future does not stop the worker; the result is simply
    /// dropped when it arrives.
    #[tokio::test]
    async fn dropped_future_discards_result() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let fut = dispatch_blocking(move || {
            started_tx.send(()).ok();
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        // Poll once so the blocking task is spawned, then drop the future.
        let handle = tokio::spawn(fut);
        started_rx.await.unwrap();
        handle.abort();

        // The worker still runs to completion.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
