//! Route guard: may the protected dashboard render for this session?

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToPublic,
}

/// Decide from the session's current authentication flag.
pub fn decide(authenticated: bool) -> GuardDecision {
    if authenticated {
        GuardDecision::Allow
    } else {
        GuardDecision::RedirectToPublic
    }
}

/// Decide from a snapshot that may not have settled. Unknown never allows.
pub fn decide_snapshot(snapshot: Option<bool>) -> GuardDecision {
    decide(snapshot.unwrap_or(false))
}
