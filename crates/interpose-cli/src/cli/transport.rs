//! In-process simulated transport used by `interpose simulate`.
//!
//! Each URL becomes a pending request whose terminal primitives just log,
//! after a short simulated round trip. With `fail` set every primitive errors.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use interpose_core::HostRequest;

const ROUND_TRIP: Duration = Duration::from_millis(2);

/// Network error codes a request can be aborted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetErrorCode {
    BlockedByClient,
    Failed,
}

impl fmt::Display for NetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetErrorCode::BlockedByClient => "blockedbyclient",
            NetErrorCode::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimOverrides {
    /// Extra headers added when forwarding.
    pub headers: Vec<(String, String)>,
}

pub struct SimulatedRequest {
    interception_id: String,
    url: String,
    fail: bool,
}

impl SimulatedRequest {
    pub fn new(seq: usize, url: &str, fail: bool) -> Self {
        Self {
            interception_id: format!("interception-sim-{seq}"),
            url: url.to_string(),
            fail,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn round_trip(&self, what: String) -> anyhow::Result<()> {
        tokio::time::sleep(ROUND_TRIP).await;
        if self.fail {
            anyhow::bail!("transport refused {} for {}", what, self.url);
        }
        tracing::info!(interception_id = %self.interception_id, url = %self.url, "{}", what);
        Ok(())
    }
}

#[async_trait]
impl HostRequest for SimulatedRequest {
    type AbortReason = NetErrorCode;
    type Response = SimResponse;
    type Overrides = SimOverrides;

    fn interception_id(&self) -> &str {
        &self.interception_id
    }

    async fn abort(&self, reason: Option<NetErrorCode>) -> anyhow::Result<()> {
        let code = reason.unwrap_or(NetErrorCode::Failed);
        self.round_trip(format!("abort ({code})")).await
    }

    async fn respond(&self, response: SimResponse) -> anyhow::Result<()> {
        self.round_trip(format!(
            "respond {} {} ({} bytes)",
            response.status,
            response.content_type,
            response.body.len()
        ))
        .await
    }

    async fn continue_request(&self, overrides: Option<SimOverrides>) -> anyhow::Result<()> {
        match overrides {
            Some(o) => {
                let names: Vec<&str> = o.headers.iter().map(|(k, _)| k.as_str()).collect();
                self.round_trip(format!("continue with headers [{}]", names.join(", ")))
                    .await
            }
            None => self.round_trip("continue".to_string()).await,
        }
    }
}
