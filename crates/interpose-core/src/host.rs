//! The host transport's view of one intercepted request.
//!
//! The transport owns the request representation and the three terminal
//! primitives; the coordinator only decides which one to call and when.

use async_trait::async_trait;

/// A pending request as provided by the host transport.
///
/// Exactly one of [`abort`](Self::abort), [`respond`](Self::respond) or
/// [`continue_request`](Self::continue_request) is called per request, once
/// every observer has settled.
#[async_trait]
pub trait HostRequest: Send + Sync + 'static {
    /// Reason attached to an abort (e.g. a network error code).
    type AbortReason: Send + 'static;
    /// Synthetic response payload.
    type Response: Send + 'static;
    /// Parameter overrides applied when forwarding.
    type Overrides: Send + 'static;

    /// Transport-supplied identifier correlating this request with its coordination state.
    fn interception_id(&self) -> &str;

    async fn abort(&self, reason: Option<Self::AbortReason>) -> anyhow::Result<()>;

    async fn respond(&self, response: Self::Response) -> anyhow::Result<()>;

    async fn continue_request(&self, overrides: Option<Self::Overrides>) -> anyhow::Result<()>;
}
