//! Pending request registry: interception id -> in-flight request.
//!
//! Entries are inserted when an interception begins and removed exactly once,
//! by the finalization cleanup guard. Nothing outside this crate can remove
//! entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::error::{InterceptError, Rejected};
use crate::host::HostRequest;
use crate::request::InterceptedRequest;

/// Opaque identifier supplied by the transport for one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptionId(String);

impl InterceptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterceptionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InterceptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for InterceptionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

type Entries<H> = HashMap<InterceptionId, Arc<InterceptedRequest<H>>>;

/// Shared map of in-flight requests. Cloning yields another handle to the same map.
pub struct PendingRegistry<H: HostRequest> {
    entries: Arc<RwLock<Entries<H>>>,
}

impl<H: HostRequest> Clone for PendingRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<H: HostRequest> Default for PendingRegistry<H> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<H: HostRequest> PendingRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries<H>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries<H>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wrap `host` with `build` and register it under its interception id.
    /// If the id is already pending, `build` is not called and the host is
    /// returned untouched.
    pub(crate) fn register_with<F>(
        &self,
        host: H,
        build: F,
    ) -> Result<Arc<InterceptedRequest<H>>, Rejected<H>>
    where
        F: FnOnce(H) -> InterceptedRequest<H>,
    {
        let id = InterceptionId::new(host.interception_id());
        let mut entries = self.write();
        if entries.contains_key(&id) {
            return Err(Rejected::new(
                InterceptError::DuplicateInterception { id },
                host,
            ));
        }
        let request = Arc::new(build(host));
        entries.insert(id, Arc::clone(&request));
        Ok(request)
    }

    pub fn get(&self, id: &str) -> Option<Arc<InterceptedRequest<H>>> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Pending ids in sorted order.
    pub fn ids(&self) -> Vec<InterceptionId> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every pending request.
    pub fn snapshot(&self) -> Vec<Arc<InterceptedRequest<H>>> {
        self.read().values().cloned().collect()
    }

    /// Weak handle used by requests to deregister themselves without keeping the map alive.
    pub(crate) fn downgrade(&self) -> RegistryHandle<H> {
        RegistryHandle {
            entries: Arc::downgrade(&self.entries),
        }
    }
}

/// Weak back-reference from a request to the registry that holds it.
pub(crate) struct RegistryHandle<H: HostRequest> {
    entries: Weak<RwLock<Entries<H>>>,
}

impl<H: HostRequest> RegistryHandle<H> {
    /// Remove `id`. Returns true if an entry was removed.
    pub(crate) fn deregister(&self, id: &InterceptionId) -> bool {
        let Some(entries) = self.entries.upgrade() else {
            return false;
        };
        let removed = entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        removed.is_some()
    }
}
