//! Candidate applications against published jobs.

pub mod domain;
pub mod machine;

pub use domain::{
    Application, ApplicationStatus, ApplicationSubmission, ApplicationView, CandidateProfile,
    DecisionVerdict, ProjectLeaderDecision, TimelineEvent,
};
pub use machine::{
    open_application, overall_score, record_assessment, transition, ApplicationEvent,
    DecisionInput,
};
