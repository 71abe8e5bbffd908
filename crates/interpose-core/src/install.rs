//! Installation of interceptors per host request type.
//!
//! Installing twice for the same host type is detected: the second call logs
//! at debug level and hands back the interceptor from the first install, whose
//! registry and error channel stay untouched.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::ErrorReporter;
use crate::host::HostRequest;
use crate::interceptor::Interceptor;

/// Result of [`HostBindings::install`].
pub enum Install<H: HostRequest> {
    /// First install for this host type.
    Installed(Interceptor<H>),
    /// Already installed; carries the existing interceptor.
    AlreadyInstalled(Interceptor<H>),
}

impl<H: HostRequest> Install<H> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Install::Installed(_))
    }

    pub fn interceptor(&self) -> &Interceptor<H> {
        match self {
            Install::Installed(i) | Install::AlreadyInstalled(i) => i,
        }
    }

    pub fn into_interceptor(self) -> Interceptor<H> {
        match self {
            Install::Installed(i) | Install::AlreadyInstalled(i) => i,
        }
    }
}

/// Host types that have an interceptor installed.
#[derive(Default)]
pub struct HostBindings {
    installed: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl HostBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an interceptor for host type `H`, or return the existing one.
    ///
    /// `errors` is only used on first install.
    pub fn install<H: HostRequest>(&self, errors: ErrorReporter) -> Install<H> {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = installed
            .get(&TypeId::of::<H>())
            .and_then(|b| b.downcast_ref::<Interceptor<H>>())
        {
            tracing::debug!(host = type_name::<H>(), "interceptor already installed");
            return Install::AlreadyInstalled(existing.clone());
        }

        tracing::info!(host = type_name::<H>(), "installing interceptor");
        let interceptor = Interceptor::<H>::new(errors);
        installed.insert(TypeId::of::<H>(), Box::new(interceptor.clone()));
        Install::Installed(interceptor)
    }

    pub fn is_installed<H: HostRequest>(&self) -> bool {
        self.installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<H>())
    }
}
