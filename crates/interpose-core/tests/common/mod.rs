//! Recording host transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use interpose_core::{HostRequest, InterceptedRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Failed,
    Aborted,
    BlockedByClient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub url: Option<String>,
    pub method: Option<String>,
}

/// Terminal action as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issued {
    Abort(Option<ErrorCode>),
    Respond(Response),
    Continue(Option<Overrides>),
}

/// Ordered record of everything that happened, shared between the host,
/// deferred handlers and outcome subscribers.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries that are outcome topic names.
    pub fn outcomes(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| ["aborted", "responded", "continued", "finalized"].contains(&e.as_str()))
            .collect()
    }
}

pub struct RecordingHost {
    pub id: String,
    pub fail: bool,
    pub panic: bool,
    pub issued: Arc<Mutex<Vec<Issued>>>,
    pub journal: Journal,
}

impl RecordingHost {
    pub fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_string(),
            fail: false,
            panic: false,
            issued: Arc::new(Mutex::new(Vec::new())),
            journal: journal.clone(),
        }
    }

    pub fn failing(id: &str, journal: &Journal) -> Self {
        Self {
            fail: true,
            ..Self::new(id, journal)
        }
    }

    pub fn panicking(id: &str, journal: &Journal) -> Self {
        Self {
            panic: true,
            ..Self::new(id, journal)
        }
    }

    fn issue(&self, action: Issued) -> anyhow::Result<()> {
        self.journal.push(format!("host {:?}", action));
        if self.panic {
            panic!("transport crashed on {:?}", action);
        }
        if self.fail {
            anyhow::bail!("transport rejected {:?}", action);
        }
        self.issued.lock().unwrap().push(action);
        Ok(())
    }
}

#[async_trait]
impl HostRequest for RecordingHost {
    type AbortReason = ErrorCode;
    type Response = Response;
    type Overrides = Overrides;

    fn interception_id(&self) -> &str {
        &self.id
    }

    async fn abort(&self, reason: Option<ErrorCode>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.issue(Issued::Abort(reason))
    }

    async fn respond(&self, response: Response) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.issue(Issued::Respond(response))
    }

    async fn continue_request(&self, overrides: Option<Overrides>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.issue(Issued::Continue(overrides))
    }
}

/// Subscribe to all four topics, writing each topic name to the journal when it fires.
pub fn record_outcomes(request: &InterceptedRequest<RecordingHost>, journal: &Journal) {
    let j = journal.clone();
    assert!(request.on_aborted(move || j.push("aborted")));
    let j = journal.clone();
    assert!(request.on_responded(move || j.push("responded")));
    let j = journal.clone();
    assert!(request.on_continued(move || j.push("continued")));
    let j = journal.clone();
    assert!(request.on_finalized(move || j.push("finalized")));
}
