//! Job postings and the approval pipeline they move through.

pub mod domain;
pub mod machine;

pub use domain::{ActorStamp, Job, JobDraft, JobStatus, WorkflowEvent};
pub use machine::{
    count_application, create_job, record_view, replace_technical_quiz, replay_history,
    revise_rejected, transition, JobEvent,
};
