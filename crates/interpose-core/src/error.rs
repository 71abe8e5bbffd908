//! Errors raised while coordinating an interception, and the channel they are reported on.
//!
//! Finalization never hands errors back to its caller. Everything goes through
//! [`ErrorReporter`], which logs and optionally forwards to a receiver.

use std::fmt;

use tokio::sync::mpsc;

use crate::decision::Decision;
use crate::registry::InterceptionId;

#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    /// A deferred handler returned an error.
    #[error("deferred handler #{index} for {id} failed: {error:#}")]
    DeferredTask {
        id: InterceptionId,
        index: usize,
        error: anyhow::Error,
    },
    /// A deferred handler panicked while being polled.
    #[error("deferred handler #{index} for {id} panicked: {message}")]
    DeferredTaskPanicked {
        id: InterceptionId,
        index: usize,
        message: String,
    },
    /// The host primitive for the chosen terminal action failed.
    #[error("{action} for {id} failed: {error:#}")]
    TerminalAction {
        id: InterceptionId,
        action: Decision,
        error: anyhow::Error,
    },
    /// `defer` was called after finalization began.
    #[error("request {id} is already finalizing; deferred handler rejected")]
    AlreadyFinalizing { id: InterceptionId },
    /// A request with this interception id is already pending.
    #[error("interception {id} is already pending")]
    DuplicateInterception { id: InterceptionId },
}

impl InterceptError {
    pub fn interception_id(&self) -> &InterceptionId {
        match self {
            InterceptError::DeferredTask { id, .. }
            | InterceptError::DeferredTaskPanicked { id, .. }
            | InterceptError::TerminalAction { id, .. }
            | InterceptError::AlreadyFinalizing { id }
            | InterceptError::DuplicateInterception { id } => id,
        }
    }

    /// True for failures of a deferred handler (error or panic).
    pub fn is_deferred_failure(&self) -> bool {
        matches!(
            self,
            InterceptError::DeferredTask { .. } | InterceptError::DeferredTaskPanicked { .. }
        )
    }
}

/// A host request that could not be intercepted. The host is handed back so
/// the caller can still issue a primitive on it directly.
pub struct Rejected<H> {
    error: InterceptError,
    host: H,
}

impl<H> Rejected<H> {
    pub(crate) fn new(error: InterceptError, host: H) -> Self {
        Self { error, host }
    }

    pub fn error(&self) -> &InterceptError {
        &self.error
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn into_parts(self) -> (InterceptError, H) {
        (self.error, self.host)
    }
}

impl<H> fmt::Debug for Rejected<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<H> fmt::Display for Rejected<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<H> std::error::Error for Rejected<H> {}

/// Sink for errors that must not propagate into the interception pipeline.
///
/// Every report is logged at error level. If built with a sender, the error is
/// also forwarded; a dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    tx: Option<mpsc::UnboundedSender<InterceptError>>,
}

impl ErrorReporter {
    /// Reporter that only logs.
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn with_sender(tx: mpsc::UnboundedSender<InterceptError>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Reporter plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InterceptError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sender(tx), rx)
    }

    pub fn report(&self, err: InterceptError) {
        tracing::error!(interception_id = %err.interception_id(), "{}", err);
        if let Some(tx) = &self.tx {
            let _ = tx.send(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_action_message_names_action_and_id() {
        let err = InterceptError::TerminalAction {
            id: InterceptionId::from("req-7"),
            action: Decision::Respond,
            error: anyhow::anyhow!("socket closed"),
        };
        assert_eq!(err.to_string(), "respond for req-7 failed: socket closed");
        assert!(!err.is_deferred_failure());
    }

    #[test]
    fn reporter_forwards_to_receiver() {
        let (reporter, mut rx) = ErrorReporter::channel();
        reporter.report(InterceptError::AlreadyFinalizing {
            id: InterceptionId::from("a"),
        });
        let err = rx.try_recv().unwrap();
        assert_eq!(err.interception_id().as_str(), "a");
    }

    #[test]
    fn reporter_tolerates_dropped_receiver() {
        let (reporter, rx) = ErrorReporter::channel();
        drop(rx);
        reporter.report(InterceptError::DuplicateInterception {
            id: InterceptionId::from("b"),
        });
        ErrorReporter::log_only().report(InterceptError::DuplicateInterception {
            id: InterceptionId::from("c"),
        });
    }
}
