//! Quizzes, timed assessment instances, and their scoring.

pub mod engine;
pub mod import;
pub mod quiz;
pub mod result;
mod scoring;
pub mod ticker;

pub use engine::{AnswerOutcome, AssessmentEngine, AssessmentError, Completion, TickOutcome};
pub use import::{QuizImportError, QuizImporter};
pub use quiz::{
    Question, QuestionDraft, QuestionId, QuestionKind, Quiz, QuizDefinitionError, QuizKind,
};
pub use result::{AnswerValue, AssessmentResult, AssessmentStatus, CompletionReason};
pub use ticker::{drive, SubscriptionId, TickSubscriber, Ticker};
