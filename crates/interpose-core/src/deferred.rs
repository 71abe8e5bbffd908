//! Deferred handler queue: async observer work that must settle before a request is resolved.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::future::{self, BoxFuture, FutureExt};

/// A queued zero-argument async task.
pub type DeferredHandler = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// How one deferred handler settled.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    Failed(anyhow::Error),
    Panicked(String),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// Handlers in insertion order.
#[derive(Default)]
pub struct DeferredQueue {
    handlers: Vec<DeferredHandler>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F, Fut>(&mut self, handler: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.push(Box::new(move || handler().boxed()));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Take every queued handler, leaving the queue empty.
    pub fn take(&mut self) -> DeferredQueue {
        std::mem::take(self)
    }

    /// Launch every handler, then await them together.
    ///
    /// All handlers are started before any is polled to completion, and they
    /// are polled concurrently on the current task. The result holds one
    /// outcome per handler, in insertion order. A panic in a handler is
    /// captured as [`TaskOutcome::Panicked`] and does not affect the others.
    pub async fn settle(self) -> Vec<TaskOutcome> {
        let launched: Vec<BoxFuture<'static, TaskOutcome>> = self
            .handlers
            .into_iter()
            .map(|handler| match panic::catch_unwind(AssertUnwindSafe(handler)) {
                Ok(fut) => AssertUnwindSafe(fut)
                    .catch_unwind()
                    .map(|settled| match settled {
                        Ok(Ok(())) => TaskOutcome::Completed,
                        Ok(Err(e)) => TaskOutcome::Failed(e),
                        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                    })
                    .boxed(),
                Err(payload) => {
                    future::ready(TaskOutcome::Panicked(panic_message(payload.as_ref()))).boxed()
                }
            })
            .collect();
        future::join_all(launched).await
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn empty_queue_settles_immediately() {
        let outcomes = DeferredQueue::new().settle().await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn handlers_run_concurrently() {
        // The first handler waits on a signal only the second one sends, so a
        // sequential run would never finish.
        let (tx, rx) = oneshot::channel::<()>();
        let mut queue = DeferredQueue::new();
        queue.push(move || async move { rx.await.map_err(anyhow::Error::from) });
        queue.push(move || async move {
            let _ = tx.send(());
            Ok(())
        });
        let outcomes = tokio::time::timeout(Duration::from_secs(5), queue.settle())
            .await
            .expect("handlers deadlocked");
        assert!(outcomes.iter().all(TaskOutcome::is_completed));
    }

    #[tokio::test(start_paused = true)]
    async fn all_handlers_launch_before_any_completes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = DeferredQueue::new();
        for i in 0..3u64 {
            let log = Arc::clone(&log);
            queue.push(move || {
                log.lock().unwrap().push(format!("start {i}"));
                async move {
                    tokio::time::sleep(Duration::from_millis(30 - i * 10)).await;
                    log.lock().unwrap().push(format!("end {i}"));
                    Ok(())
                }
            });
        }
        queue.settle().await;
        let log = log.lock().unwrap();
        assert_eq!(&log[..3], ["start 0", "start 1", "start 2"]);
        assert_eq!(&log[3..], ["end 2", "end 1", "end 0"]);
    }

    #[tokio::test]
    async fn failures_and_panics_are_isolated() {
        let mut queue = DeferredQueue::new();
        queue.push(|| async { Err(anyhow::anyhow!("observer failed")) });
        queue.push(|| async {
            let broken = true;
            if broken {
                panic!("observer bug");
            }
            Ok(())
        });
        queue.push(|| -> futures::future::Ready<anyhow::Result<()>> { panic!("eager bug") });
        queue.push(|| async { Ok(()) });
        assert_eq!(queue.len(), 4);

        let outcomes = queue.settle().await;
        assert!(matches!(&outcomes[0], TaskOutcome::Failed(e) if e.to_string() == "observer failed"));
        assert!(matches!(&outcomes[1], TaskOutcome::Panicked(m) if m == "observer bug"));
        assert!(matches!(&outcomes[2], TaskOutcome::Panicked(m) if m == "eager bug"));
        assert!(outcomes[3].is_completed());
    }

    #[test]
    fn take_empties_the_queue() {
        let mut queue = DeferredQueue::new();
        queue.push(|| async { Ok(()) });
        let taken = queue.take();
        assert!(queue.is_empty());
        assert_eq!(taken.len(), 1);
    }
}
