//! Lifecycle of a guarded query.
//!
//! A query may depend on a prerequisite (another query that must have
//! succeeded) and on a key (the locale, the signed-in username). [`plan`]
//! decides from those inputs whether the query should fetch, wait, or leave
//! its current result alone.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryStatus {
    #[default]
    NotStarted,
    WaitingOnPrerequisite,
    InFlight,
    Succeeded(DateTime<Utc>),
    Failed(String),
}

impl QueryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPlan {
    /// Prerequisite not met; record that and do not issue anything.
    Wait,
    /// Issue a request for the wanted key.
    Fetch,
    /// The current status already answers for the wanted key.
    Keep,
}

/// Transition function of the query state machine.
///
/// * prerequisite missing → `Wait` (or `Keep` if already waiting)
/// * prerequisite met, and the last request was for another key, or never
///   issued → `Fetch`
/// * otherwise → `Keep`. In-flight requests are not duplicated and failures
///   are not retried until the key changes.
pub fn plan<K: PartialEq>(
    prerequisite_met: bool,
    status: &QueryStatus,
    issued_for: Option<&K>,
    wanted: &K,
) -> QueryPlan {
    if !prerequisite_met {
        return match status {
            QueryStatus::WaitingOnPrerequisite => QueryPlan::Keep,
            _ => QueryPlan::Wait,
        };
    }
    match status {
        QueryStatus::NotStarted | QueryStatus::WaitingOnPrerequisite => QueryPlan::Fetch,
        _ if issued_for != Some(wanted) => QueryPlan::Fetch,
        _ => QueryPlan::Keep,
    }
}
