//! Decision accumulator and the terminal priority rule.
//!
//! Observers record intents (abort, respond, continue) in any order. The
//! winning intent is chosen by a fixed priority when the request is resolved:
//! abort beats respond beats continue, regardless of which was recorded last.

use std::fmt;

/// The terminal action a request will (or did) receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Forward the request, optionally with overrides. The default.
    Continue,
    /// Answer the request with a synthetic response.
    Respond,
    /// Fail the request.
    Abort,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Continue => "continue",
            Decision::Respond => "respond",
            Decision::Abort => "abort",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved terminal action with the payload it will be issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<A, R, O> {
    Abort(Option<A>),
    Respond(R),
    Continue(Option<O>),
}

impl<A, R, O> Resolution<A, R, O> {
    pub fn decision(&self) -> Decision {
        match self {
            Resolution::Abort(_) => Decision::Abort,
            Resolution::Respond(_) => Decision::Respond,
            Resolution::Continue(_) => Decision::Continue,
        }
    }
}

/// Intents recorded against one request.
///
/// `A`, `R` and `O` are the host's abort reason, response payload and
/// continue overrides. Each kind keeps only its latest payload.
pub struct DecisionState<A, R, O> {
    should_abort: bool,
    abort_reason: Option<A>,
    response: Option<R>,
    continue_overrides: Option<O>,
}

impl<A, R, O> Default for DecisionState<A, R, O> {
    fn default() -> Self {
        Self {
            should_abort: false,
            abort_reason: None,
            response: None,
            continue_overrides: None,
        }
    }
}

impl<A, R, O> DecisionState<A, R, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an abort intent. A later abort replaces the reason.
    pub fn mark_abort(&mut self, reason: Option<A>) {
        self.should_abort = true;
        self.abort_reason = reason;
    }

    /// Record a respond intent. A later respond replaces the payload.
    pub fn mark_respond(&mut self, response: R) {
        self.response = Some(response);
    }

    /// Record continue overrides (`None` clears earlier overrides).
    pub fn mark_continue(&mut self, overrides: Option<O>) {
        self.continue_overrides = overrides;
    }

    /// The decision that would win if the request were resolved now.
    pub fn decision(&self) -> Decision {
        if self.should_abort {
            Decision::Abort
        } else if self.response.is_some() {
            Decision::Respond
        } else {
            Decision::Continue
        }
    }

    /// Consume the intents and pick the terminal action by priority.
    pub fn resolve(self) -> Resolution<A, R, O> {
        if self.should_abort {
            return Resolution::Abort(self.abort_reason);
        }
        match self.response {
            Some(response) => Resolution::Respond(response),
            None => Resolution::Continue(self.continue_overrides),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = DecisionState<&'static str, &'static str, &'static str>;

    #[test]
    fn default_is_continue_without_overrides() {
        let state = State::new();
        assert_eq!(state.decision(), Decision::Continue);
        assert_eq!(state.resolve(), Resolution::Continue(None));
    }

    #[test]
    fn abort_beats_respond_in_either_order() {
        let mut a = State::new();
        a.mark_abort(Some("failed"));
        a.mark_respond("body");
        assert_eq!(a.resolve(), Resolution::Abort(Some("failed")));

        let mut b = State::new();
        b.mark_respond("body");
        b.mark_abort(Some("failed"));
        assert_eq!(b.resolve(), Resolution::Abort(Some("failed")));
    }

    #[test]
    fn respond_beats_continue_in_either_order() {
        let mut a = State::new();
        a.mark_respond("x");
        a.mark_continue(Some("y"));
        assert_eq!(a.decision(), Decision::Respond);
        assert_eq!(a.resolve(), Resolution::Respond("x"));

        let mut b = State::new();
        b.mark_continue(Some("y"));
        b.mark_respond("x");
        assert_eq!(b.resolve(), Resolution::Respond("x"));
    }

    #[test]
    fn abort_without_reason_still_wins() {
        let mut state = State::new();
        state.mark_continue(Some("y"));
        state.mark_abort(None);
        assert_eq!(state.resolve(), Resolution::Abort(None));
    }

    #[test]
    fn same_kind_is_last_write_wins() {
        let mut state = State::new();
        state.mark_respond("first");
        state.mark_respond("second");
        assert_eq!(state.resolve(), Resolution::Respond("second"));

        let mut state = State::new();
        state.mark_continue(Some("a"));
        state.mark_continue(None);
        assert_eq!(state.resolve(), Resolution::Continue(None));
    }

    #[test]
    fn decision_display_names() {
        assert_eq!(Decision::Abort.to_string(), "abort");
        assert_eq!(Decision::Respond.to_string(), "respond");
        assert_eq!(Decision::Continue.to_string(), "continue");
    }
}
