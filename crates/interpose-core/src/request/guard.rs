//! Cleanup guard that completes finalization when dropped.

use super::{InterceptedRequest, Phase};
use crate::host::HostRequest;

/// Deregisters the request, marks it finalized and closes its emitter when
/// dropped, whether finalization succeeded, failed or was cancelled. Callers
/// waiting on an in-flight finalization are released last.
pub(super) struct FinalizeGuard<'a, H: HostRequest> {
    pub(super) request: &'a InterceptedRequest<H>,
}

impl<H: HostRequest> Drop for FinalizeGuard<'_, H> {
    fn drop(&mut self) {
        let request = self.request;
        let removed = request.registry.deregister(&request.id);
        request.lock_state().phase = Phase::Finalized;
        request.emitter.close();
        request.finished.send_replace(true);
        tracing::debug!(interception_id = %request.id, removed, "interception finalized");
    }
}
