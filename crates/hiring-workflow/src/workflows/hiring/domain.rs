use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for candidate applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for people (or the system) acting on a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of roles recognised by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    ProjectLeader,
    Hr,
    Ceo,
    Candidate,
    System,
}

impl Role {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::ProjectLeader,
            Self::Hr,
            Self::Ceo,
            Self::Candidate,
            Self::System,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectLeader => "PROJECT_LEADER",
            Self::Hr => "HR",
            Self::Ceo => "CEO",
            Self::Candidate => "CANDIDATE",
            Self::System => "SYSTEM",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ProjectLeader => "Project Leader",
            Self::Hr => "HR Manager",
            Self::Ceo => "CEO",
            Self::Candidate => "Candidate",
            Self::System => "System",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Role::ordered()
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(raw.trim().to_string()))
    }
}

/// Who is asking for a transition. Passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: ActorId,
    pub roles: BTreeSet<Role>,
}

impl ActorContext {
    pub fn new(actor_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            actor_id: ActorId(actor_id.into()),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn single(actor_id: impl Into<String>, role: Role) -> Self {
        Self::new(actor_id, [role])
    }

    /// Actor used for transitions nobody asked for explicitly (timer expiry, hard gates).
    pub fn system() -> Self {
        Self::single("system", Role::System)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fallback role for audit stamps when no held role owns the edge: the first held role
    /// in declaration order, `SYSTEM` when the set is empty.
    pub fn primary_role(&self) -> Role {
        self.roles.iter().next().copied().unwrap_or(Role::System)
    }
}

/// Errors raised while computing a Job or Application transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("transition from {from} to {to} is not defined")]
    IllegalTransition { from: &'static str, to: &'static str },
    #[error("actor {actor} may not move the record from {from} to {to}")]
    Unauthorized {
        actor: ActorId,
        from: &'static str,
        to: &'static str,
    },
    #[error("job is missing {field}")]
    IncompleteJob { field: &'static str },
    #[error("{kind} assessment has not been completed")]
    AssessmentPending { kind: &'static str },
    #[error("actor {actor} is not the candidate who owns this application")]
    CandidateMismatch { actor: ActorId },
    #[error("record changed since it was loaded (expected version {expected}, found {found})")]
    StaleWrite { expected: u64, found: u64 },
    #[error("job is {status}, not published")]
    JobNotPublished { status: &'static str },
    #[error("record can no longer be edited while {status}")]
    RecordLocked { status: &'static str },
}

/// Source of wall-clock time, injected so transitions are testable without a real clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and simulated demos.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clamp `now` so an append-only log never goes backwards in time.
pub(crate) fn monotonic(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}
