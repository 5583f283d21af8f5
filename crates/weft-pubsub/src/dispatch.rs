//! Fire-and-forget work queue backing the asynchronous publish path.
//!
//! A single drain task consumes an unbounded channel, so work items run in
//! enqueue order. Publishes from one handle therefore reach subscribers in
//! call order; no ordering is promised across handles in different
//! processes.

use crate::{PubSubError, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Ordered queue of fire-and-forget work items.
pub struct DispatchQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl DispatchQueue {
    /// Create a queue whose drain task runs on the given runtime
    pub fn new(runtime: &tokio::runtime::Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        runtime.spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
            }
            debug!("Dispatch queue drained and closed");
        });

        Self { sender }
    }

    /// Enqueue a work item without blocking
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.sender
            .send(Box::new(job))
            .map_err(|_| PubSubError::dispatch("dispatch queue is closed"))
    }

    /// Wait until every work item enqueued before this call has run
    pub async fn flush(&self) -> Result<()> {
        let (done, waiter) = oneshot::channel();
        self.enqueue(move || {
            let _ = done.send(());
        })?;
        waiter
            .await
            .map_err(|_| PubSubError::dispatch("dispatch queue dropped the flush marker"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_enqueued_jobs_run() {
        let fixture = DispatchQueue::new(&tokio::runtime::Handle::current());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = counter.clone();
            fixture
                .enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        fixture.flush().await.unwrap();

        let actual = counter.load(Ordering::SeqCst);
        assert_eq!(actual, 5);
    }

    #[tokio::test]
    async fn test_jobs_run_in_enqueue_order() {
        let fixture = DispatchQueue::new(&tokio::runtime::Handle::current());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = order.clone();
            fixture
                .enqueue(move || {
                    order.lock().push(i);
                })
                .unwrap();
        }
        fixture.flush().await.unwrap();

        let actual = order.lock().clone();
        let expected: Vec<i32> = (0..10).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_flush_with_empty_queue_completes() {
        let fixture = DispatchQueue::new(&tokio::runtime::Handle::current());
        fixture.flush().await.unwrap();
    }
}
