//! Finalization: settle deferred handlers, resolve by priority, issue the terminal action.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::watch;

use super::guard::FinalizeGuard;
use super::{InterceptedRequest, Phase};
use crate::decision::{DecisionState, Resolution};
use crate::deferred::{panic_message, DeferredQueue, TaskOutcome};
use crate::error::InterceptError;
use crate::events::InterceptionOutcome;
use crate::host::HostRequest;

enum Start {
    Run(DeferredQueue),
    Wait(watch::Receiver<bool>),
    Done,
}

impl<H: HostRequest> InterceptedRequest<H> {
    /// Await every deferred handler, then issue exactly one terminal action.
    ///
    /// Abort wins over respond, respond over continue. On success the matching
    /// outcome topic fires, then `finalized`. On failure the error is reported
    /// and no topic fires. Never returns an error; the request is always
    /// deregistered by the time this returns. If another caller is already
    /// finalizing, this waits for that run to finish instead of starting a
    /// second one. Once finalized, calling it again is a no-op.
    pub async fn finalize_interception(&self) {
        self.run_finalization().await;
    }

    /// Returns true if this call performed the finalization.
    pub(crate) async fn run_finalization(&self) -> bool {
        let deferred = match self.begin() {
            Start::Run(deferred) => deferred,
            Start::Wait(mut finished) => {
                tracing::debug!(interception_id = %self.id, "waiting for in-flight finalization");
                // The sender lives as long as the request, so this only ends once the guard fires.
                let _ = finished.wait_for(|done| *done).await;
                return false;
            }
            Start::Done => {
                tracing::debug!(interception_id = %self.id, "already finalized");
                return false;
            }
        };
        let _guard = FinalizeGuard { request: self };

        tracing::debug!(interception_id = %self.id, handlers = deferred.len(), "settling deferred handlers");
        let outcomes = deferred.settle().await;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                TaskOutcome::Completed => {}
                TaskOutcome::Failed(error) => self.errors.report(InterceptError::DeferredTask {
                    id: self.id.clone(),
                    index,
                    error,
                }),
                TaskOutcome::Panicked(message) => {
                    self.errors.report(InterceptError::DeferredTaskPanicked {
                        id: self.id.clone(),
                        index,
                        message,
                    })
                }
            }
        }

        let resolution = {
            let mut state = self.lock_state();
            state.phase = Phase::Resolving;
            let resolution = std::mem::replace(&mut state.decision, DecisionState::new()).resolve();
            state.resolved = Some(resolution.decision());
            resolution
        };
        self.issue(resolution).await;
        true
    }

    fn begin(&self) -> Start {
        let mut state = self.lock_state();
        match state.phase {
            Phase::Open => {
                state.phase = Phase::Settling;
                Start::Run(state.deferred.take())
            }
            Phase::Settling | Phase::Resolving => Start::Wait(self.finished.subscribe()),
            Phase::Finalized => Start::Done,
        }
    }

    async fn issue(&self, resolution: Resolution<H::AbortReason, H::Response, H::Overrides>) {
        let action = resolution.decision();
        tracing::debug!(interception_id = %self.id, %action, "issuing terminal action");

        let call = async {
            match resolution {
                Resolution::Abort(reason) => self.host.abort(reason).await,
                Resolution::Respond(response) => self.host.respond(response).await,
                Resolution::Continue(overrides) => self.host.continue_request(overrides).await,
            }
        };
        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "host primitive panicked: {}",
                panic_message(payload.as_ref())
            )),
        };

        match result {
            Ok(()) => {
                self.emitter.emit(InterceptionOutcome::from(action));
                self.emitter.emit(InterceptionOutcome::Finalized);
            }
            Err(error) => self.errors.report(InterceptError::TerminalAction {
                id: self.id.clone(),
                action,
                error,
            }),
        }
    }
}
