//! Recruitment pipeline: job approval, candidate applications, and timed assessments.
//!
//! Both state machines are pure functions over immutable records; [`HiringService`]
//! sequences them with persistence, notifications, and the running assessment engines.

pub mod applications;
pub mod assessment;
pub mod domain;
pub mod gate;
pub mod jobs;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use applications::{
    Application, ApplicationEvent, ApplicationStatus, ApplicationSubmission, ApplicationView,
    CandidateProfile, DecisionInput, DecisionVerdict, ProjectLeaderDecision, TimelineEvent,
};
pub use assessment::{
    drive, AnswerOutcome, AnswerValue, AssessmentEngine, AssessmentError, AssessmentResult,
    AssessmentStatus, Completion, CompletionReason, Question, QuestionDraft, QuestionId,
    QuestionKind, Quiz, QuizDefinitionError, QuizImportError, QuizImporter, QuizKind,
    SubscriptionId, TickOutcome, TickSubscriber, Ticker,
};
pub use domain::{
    ActorContext, ActorId, ApplicationId, Clock, JobId, ManualClock, Role, SystemClock,
    TransitionError, UnknownRole,
};
pub use gate::{GatedState, RoleGate};
pub use jobs::{ActorStamp, Job, JobDraft, JobEvent, JobStatus, WorkflowEvent};
pub use report::{JobPipelineSummary, ReportError};
pub use repository::{
    ApplicationRef, ApplicationRepository, JobRef, JobRepository, NotificationEvent, Notifier,
    NotifyError, RepositoryError,
};
pub use router::{actor_from_headers, hiring_router, HiringApiError};
pub use service::{HiringService, HiringServiceError};
