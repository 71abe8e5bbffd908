//! An intercepted request: the host request decorated with coordination state.
//!
//! Observers record intents, queue deferred work and subscribe to outcomes
//! while the request is open. [`InterceptedRequest::finalize_interception`]
//! settles the deferred work, issues the winning terminal action on the host
//! request, and fires the outcome topics.

mod finalize;
mod guard;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::decision::{Decision, DecisionState};
use crate::deferred::DeferredQueue;
use crate::error::{ErrorReporter, InterceptError};
use crate::events::{InterceptionOutcome, OutcomeEmitter};
use crate::host::HostRequest;
use crate::registry::{InterceptionId, RegistryHandle};

/// Where a request is in its coordination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting intents, deferred handlers and subscriptions.
    Open,
    /// Deferred handlers are being awaited. Intents are still recorded; new
    /// deferred handlers are rejected.
    Settling,
    /// The terminal action has been chosen and is being issued.
    Resolving,
    /// Terminal action issued (or failed) and the request deregistered.
    Finalized,
}

type HostDecision<H> = DecisionState<
    <H as HostRequest>::AbortReason,
    <H as HostRequest>::Response,
    <H as HostRequest>::Overrides,
>;

struct RequestState<H: HostRequest> {
    decision: HostDecision<H>,
    deferred: DeferredQueue,
    phase: Phase,
    resolved: Option<Decision>,
}

pub struct InterceptedRequest<H: HostRequest> {
    id: InterceptionId,
    host: H,
    state: Mutex<RequestState<H>>,
    emitter: OutcomeEmitter,
    registry: RegistryHandle<H>,
    errors: ErrorReporter,
    /// Flipped to true by the cleanup guard; repeat finalize callers wait on it.
    finished: watch::Sender<bool>,
}

impl<H: HostRequest> InterceptedRequest<H> {
    pub(crate) fn new(host: H, registry: RegistryHandle<H>, errors: ErrorReporter) -> Self {
        Self {
            id: InterceptionId::new(host.interception_id()),
            host,
            state: Mutex::new(RequestState {
                decision: DecisionState::new(),
                deferred: DeferredQueue::new(),
                phase: Phase::Open,
                resolved: None,
            }),
            emitter: OutcomeEmitter::new(),
            registry,
            errors,
            finished: watch::channel(false).0,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RequestState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn interception_id(&self) -> &InterceptionId {
        &self.id
    }

    /// The wrapped host request.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn phase(&self) -> Phase {
        self.lock_state().phase
    }

    pub fn is_finalized(&self) -> bool {
        self.phase() == Phase::Finalized
    }

    /// The decision that would win if the request were resolved now, or the
    /// one that was chosen once resolution happened.
    pub fn decision(&self) -> Decision {
        let state = self.lock_state();
        state.resolved.unwrap_or_else(|| state.decision.decision())
    }

    /// Number of deferred handlers queued and not yet launched.
    pub fn deferred_count(&self) -> usize {
        self.lock_state().deferred.len()
    }

    /// Queue async work that must settle before the terminal action is chosen.
    ///
    /// Rejected with [`InterceptError::AlreadyFinalizing`] once finalization began.
    pub fn defer<F, Fut>(&self, handler: F) -> Result<(), InterceptError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut state = self.lock_state();
        if state.phase != Phase::Open {
            tracing::debug!(interception_id = %self.id, phase = ?state.phase, "deferred handler rejected");
            return Err(InterceptError::AlreadyFinalizing {
                id: self.id.clone(),
            });
        }
        state.deferred.push(handler);
        Ok(())
    }

    /// Record an abort intent. Abort wins over respond and continue.
    pub fn mark_abort(&self, reason: Option<H::AbortReason>) {
        self.record(Decision::Abort, |d| d.mark_abort(reason));
    }

    /// Record a respond intent. Respond wins over continue.
    pub fn mark_respond(&self, response: H::Response) {
        self.record(Decision::Respond, |d| d.mark_respond(response));
    }

    /// Record continue overrides; used only if nobody aborts or responds.
    pub fn mark_continue(&self, overrides: Option<H::Overrides>) {
        self.record(Decision::Continue, |d| d.mark_continue(overrides));
    }

    fn record(&self, kind: Decision, apply: impl FnOnce(&mut HostDecision<H>)) {
        let mut state = self.lock_state();
        match state.phase {
            Phase::Open | Phase::Settling => {
                apply(&mut state.decision);
                tracing::trace!(interception_id = %self.id, intent = %kind, "intent recorded");
            }
            Phase::Resolving | Phase::Finalized => {
                tracing::debug!(interception_id = %self.id, intent = %kind, "intent ignored after resolution");
            }
        }
    }

    /// Subscribe to the `aborted` topic. Returns false if it can no longer fire.
    pub fn on_aborted<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.emitter.subscribe(InterceptionOutcome::Aborted, callback)
    }

    pub fn on_responded<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.emitter.subscribe(InterceptionOutcome::Responded, callback)
    }

    pub fn on_continued<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.emitter.subscribe(InterceptionOutcome::Continued, callback)
    }

    /// Subscribe to the `finalized` topic, which follows any successful terminal action.
    pub fn on_finalized<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.emitter.subscribe(InterceptionOutcome::Finalized, callback)
    }

    /// Whether an outcome topic has fired for this request.
    pub fn has_fired(&self, outcome: InterceptionOutcome) -> bool {
        self.emitter.has_fired(outcome)
    }
}
