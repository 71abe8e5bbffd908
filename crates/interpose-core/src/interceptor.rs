//! Interceptor: wraps host requests as they arrive and owns the pending registry.

use std::sync::Arc;

use futures::future;

use crate::error::{ErrorReporter, Rejected};
use crate::host::HostRequest;
use crate::registry::{InterceptionId, PendingRegistry};
use crate::request::InterceptedRequest;

/// Entry point for one host request type. Cheap to clone; clones share the
/// registry and error channel.
pub struct Interceptor<H: HostRequest> {
    registry: PendingRegistry<H>,
    errors: ErrorReporter,
}

impl<H: HostRequest> Clone for Interceptor<H> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<H: HostRequest> Interceptor<H> {
    pub fn new(errors: ErrorReporter) -> Self {
        Self {
            registry: PendingRegistry::new(),
            errors,
        }
    }

    /// Wrap a freshly intercepted host request and register it under its
    /// interception id.
    ///
    /// If a request with the same id is still pending, the host is handed
    /// back inside [`Rejected`] and the existing entry is left alone.
    pub fn intercept(&self, host: H) -> Result<Arc<InterceptedRequest<H>>, Rejected<H>> {
        let handle = self.registry.downgrade();
        let errors = self.errors.clone();
        let request = self
            .registry
            .register_with(host, |host| InterceptedRequest::new(host, handle, errors))?;
        tracing::debug!(interception_id = %request.interception_id(), "interception registered");
        Ok(request)
    }

    pub fn registry(&self) -> &PendingRegistry<H> {
        &self.registry
    }

    pub fn errors(&self) -> &ErrorReporter {
        &self.errors
    }

    pub fn get(&self, id: &str) -> Option<Arc<InterceptedRequest<H>>> {
        self.registry.get(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pending_ids(&self) -> Vec<InterceptionId> {
        self.registry.ids()
    }

    /// Finalize the pending request with this id and wait until it is
    /// deregistered. Returns false if none is pending.
    pub async fn finalize(&self, id: &str) -> bool {
        match self.registry.get(id) {
            Some(request) => {
                request.finalize_interception().await;
                true
            }
            None => false,
        }
    }

    /// Finalize every currently pending request concurrently.
    ///
    /// Requests already finalizing elsewhere are waited for but not counted;
    /// the return value is how many this call finalized itself.
    pub async fn finalize_all(&self) -> usize {
        let pending = self.registry.snapshot();
        let ran = future::join_all(pending.iter().map(|r| r.run_finalization())).await;
        ran.into_iter().filter(|&ran| ran).count()
    }
}
