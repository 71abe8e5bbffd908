//! Single-shot outcome notifications for one intercepted request.
//!
//! Four topics, each firing at most once. Firing drains the subscriber list;
//! subscribers added after a topic fired (or after the emitter was closed)
//! are rejected rather than replayed.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::decision::Decision;

/// Notification topics emitted when an interception completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptionOutcome {
    Aborted,
    Responded,
    Continued,
    Finalized,
}

impl InterceptionOutcome {
    pub const ALL: [InterceptionOutcome; 4] = [
        InterceptionOutcome::Aborted,
        InterceptionOutcome::Responded,
        InterceptionOutcome::Continued,
        InterceptionOutcome::Finalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterceptionOutcome::Aborted => "aborted",
            InterceptionOutcome::Responded => "responded",
            InterceptionOutcome::Continued => "continued",
            InterceptionOutcome::Finalized => "finalized",
        }
    }

    fn index(self) -> usize {
        match self {
            InterceptionOutcome::Aborted => 0,
            InterceptionOutcome::Responded => 1,
            InterceptionOutcome::Continued => 2,
            InterceptionOutcome::Finalized => 3,
        }
    }
}

impl fmt::Display for InterceptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Decision> for InterceptionOutcome {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Abort => InterceptionOutcome::Aborted,
            Decision::Respond => InterceptionOutcome::Responded,
            Decision::Continue => InterceptionOutcome::Continued,
        }
    }
}

pub type OutcomeCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Topic {
    callbacks: Vec<OutcomeCallback>,
    fired: bool,
}

#[derive(Default)]
struct Topics {
    topics: [Topic; 4],
    closed: bool,
}

/// Per-request fan-out of the four outcome topics.
#[derive(Default)]
pub struct OutcomeEmitter {
    inner: Mutex<Topics>,
}

impl OutcomeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Topics> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a callback. Returns false (and drops the callback) if the topic
    /// already fired or the emitter is closed.
    pub fn subscribe<F>(&self, outcome: InterceptionOutcome, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        let topic = &mut inner.topics[outcome.index()];
        if topic.fired {
            return false;
        }
        topic.callbacks.push(Box::new(callback));
        true
    }

    /// Fire a topic, invoking its subscribers in subscription order.
    ///
    /// Returns the number of callbacks run; 0 if the topic had already fired.
    /// Callbacks run outside the lock so they may subscribe to other topics.
    pub fn emit(&self, outcome: InterceptionOutcome) -> usize {
        let callbacks = {
            let mut inner = self.lock();
            if inner.closed {
                return 0;
            }
            let topic = &mut inner.topics[outcome.index()];
            if topic.fired {
                return 0;
            }
            topic.fired = true;
            std::mem::take(&mut topic.callbacks)
        };
        let count = callbacks.len();
        for callback in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::warn!(%outcome, "outcome subscriber panicked");
            }
        }
        count
    }

    pub fn has_fired(&self, outcome: InterceptionOutcome) -> bool {
        self.lock().topics[outcome.index()].fired
    }

    pub fn subscriber_count(&self, outcome: InterceptionOutcome) -> usize {
        self.lock().topics[outcome.index()].callbacks.len()
    }

    /// Drop every pending subscriber and refuse new ones.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        for topic in inner.topics.iter_mut() {
            topic.callbacks.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
