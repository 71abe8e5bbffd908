//! Deferred multi-party request interception.
//!
//! Any number of observers attach intents and async work to an in-flight
//! request; once all of it has settled, exactly one terminal action (abort,
//! respond or continue) is issued on the host request and outcome
//! notifications fire once.

pub mod config;
pub mod logging;

pub mod decision;
pub mod deferred;
pub mod error;
pub mod events;
pub mod host;
pub mod install;
pub mod interceptor;
pub mod registry;
pub mod request;

pub use decision::{Decision, Resolution};
pub use error::{ErrorReporter, InterceptError, Rejected};
pub use events::InterceptionOutcome;
pub use host::HostRequest;
pub use install::{HostBindings, Install};
pub use interceptor::Interceptor;
pub use registry::{InterceptionId, PendingRegistry};
pub use request::{InterceptedRequest, Phase};
