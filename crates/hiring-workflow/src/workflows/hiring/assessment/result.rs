use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::{QuestionId, Quiz, QuizKind};

/// Candidate answer for a single question.
///
/// Multiple-choice answers carry the selected option index and rating answers the chosen
/// value; free-form questions carry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Selected(u32),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    NotStarted,
    InProgress,
    Completed,
    Expired,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    /// Completed and expired results never change again.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

/// Why an assessment stopped accepting answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Submitted,
    TimeExpired,
    Cancelled,
}

/// Scored outcome of one assessment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    #[serde(rename = "type")]
    pub kind: QuizKind,
    pub status: AssessmentStatus,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u8,
    pub passed: bool,
    pub passing_score: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: BTreeMap<QuestionId, AnswerValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_review: Vec<QuestionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionReason>,
}

impl AssessmentResult {
    /// Placeholder attached to an application before the candidate opens the quiz.
    pub fn not_started(kind: QuizKind, quiz: &Quiz) -> Self {
        Self {
            kind,
            status: AssessmentStatus::NotStarted,
            score: 0,
            max_score: quiz.total_points(),
            percentage: 0,
            passed: false,
            passing_score: quiz.passing_score(),
            started_at: None,
            completed_at: None,
            answers: BTreeMap::new(),
            manual_review: Vec::new(),
            completion: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AssessmentStatus::Completed
    }

    pub fn needs_manual_review(&self) -> bool {
        !self.manual_review.is_empty()
    }
}
