//! `interpose simulate` – run URLs through the interceptor with a delayed observer.
//!
//! Installs the interceptor twice (the second install is a no-op), then for
//! each URL attaches an observer that, after a delay, aborts or answers the
//! request based on its path suffix. All requests are finalized concurrently.

use anyhow::Result;
use interpose_core::config::SimulateConfig;
use interpose_core::{ErrorReporter, HostBindings, InterceptedRequest, InterceptionOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::transport::{NetErrorCode, SimOverrides, SimResponse, SimulatedRequest};

/// Outcome counts for one simulation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationSummary {
    pub requests: usize,
    pub aborted: usize,
    pub responded: usize,
    pub continued: usize,
    pub finalized: usize,
    pub errors: usize,
}

#[derive(Default)]
struct Counters {
    aborted: AtomicUsize,
    responded: AtomicUsize,
    continued: AtomicUsize,
    finalized: AtomicUsize,
}

impl Counters {
    fn bump(&self, outcome: InterceptionOutcome) {
        let counter = match outcome {
            InterceptionOutcome::Aborted => &self.aborted,
            InterceptionOutcome::Responded => &self.responded,
            InterceptionOutcome::Continued => &self.continued,
            InterceptionOutcome::Finalized => &self.finalized,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub async fn run_simulate(settings: &SimulateConfig, urls: &[String]) -> Result<SimulationSummary> {
    let (errors, mut error_rx) = ErrorReporter::channel();
    let bindings = HostBindings::new();
    let interceptor = bindings.install::<SimulatedRequest>(errors).into_interceptor();
    if !bindings
        .install::<SimulatedRequest>(ErrorReporter::log_only())
        .is_fresh()
    {
        println!("interceptor already installed; reusing it");
    }

    let counters = Arc::new(Counters::default());
    for (seq, url) in urls.iter().enumerate() {
        let request = interceptor.intercept(SimulatedRequest::new(seq, url, settings.fail_actions))?;
        attach_observer(&request, settings);
        subscribe_printers(&request, &counters);
    }

    let requests = interceptor.finalize_all().await;

    let mut error_count = 0;
    while let Ok(err) = error_rx.try_recv() {
        println!("error: {}", err);
        error_count += 1;
    }

    let summary = SimulationSummary {
        requests,
        aborted: counters.aborted.load(Ordering::Relaxed),
        responded: counters.responded.load(Ordering::Relaxed),
        continued: counters.continued.load(Ordering::Relaxed),
        finalized: counters.finalized.load(Ordering::Relaxed),
        errors: error_count,
    };
    println!(
        "{} request(s): {} aborted, {} responded, {} continued, {} finalized, {} error(s)",
        summary.requests,
        summary.aborted,
        summary.responded,
        summary.continued,
        summary.finalized,
        summary.errors
    );
    Ok(summary)
}

/// Observer: wait, then decide from the URL path (abort, respond, or continue
/// with an extra header). An unparsable URL fails the handler, which leaves
/// the request on its default (plain continue).
fn attach_observer(request: &Arc<InterceptedRequest<SimulatedRequest>>, settings: &SimulateConfig) {
    let observer = Arc::clone(request);
    let delay = Duration::from_millis(settings.observer_delay_ms);
    let abort_suffixes = settings.abort_suffixes.clone();
    let respond_suffixes = settings.respond_suffixes.clone();
    let body = settings.respond_body.clone();

    let deferred = request.defer(move || async move {
        tokio::time::sleep(delay).await;
        let parsed = url::Url::parse(observer.host().url())?;
        let path = parsed.path();
        if abort_suffixes.iter().any(|s| path.ends_with(s.as_str())) {
            observer.mark_abort(Some(NetErrorCode::BlockedByClient));
        } else if respond_suffixes.iter().any(|s| path.ends_with(s.as_str())) {
            observer.mark_respond(SimResponse {
                status: 200,
                content_type: "text/plain".to_string(),
                body,
            });
        } else {
            observer.mark_continue(Some(SimOverrides {
                headers: vec![("x-interposed".to_string(), "1".to_string())],
            }));
        }
        Ok::<(), anyhow::Error>(())
    });
    if let Err(e) = deferred {
        tracing::warn!("observer not attached: {}", e);
    }
}

fn subscribe_printers(request: &InterceptedRequest<SimulatedRequest>, counters: &Arc<Counters>) {
    for outcome in InterceptionOutcome::ALL {
        let url = request.host().url().to_string();
        let counters = Arc::clone(counters);
        let callback = move || {
            counters.bump(outcome);
            println!("{:<10} {}", outcome.as_str(), url);
        };
        let _ = match outcome {
            InterceptionOutcome::Aborted => request.on_aborted(callback),
            InterceptionOutcome::Responded => request.on_responded(callback),
            InterceptionOutcome::Continued => request.on_continued(callback),
            InterceptionOutcome::Finalized => request.on_finalized(callback),
        };
    }
}
