use chrono::{DateTime, Utc};
use tracing::debug;

use super::quiz::{QuestionId, QuestionKind, Quiz, QuizKind};
use super::result::{AnswerValue, AssessmentResult, AssessmentStatus, CompletionReason};
use super::scoring;
use crate::workflows::hiring::domain::monotonic;

/// Misuse of an assessment instance. Late events against a finished instance are not
/// errors; they resolve to no-ops instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssessmentError {
    #[error("quiz has no questions")]
    EmptyQuiz,
    #[error("assessment has not been started")]
    NotStarted,
    #[error("assessment has already been started")]
    AlreadyStarted,
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("question {question} expects {expected}")]
    AnswerMismatch {
        question: QuestionId,
        expected: &'static str,
    },
}

/// Whether an answer was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded,
    IgnoredFinished,
}

/// Result of asking the engine to finish. Both variants carry the same frozen result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// This call moved the instance into its finished state.
    Finished(AssessmentResult),
    /// The instance was already finished; nothing was re-scored.
    AlreadyFinished(AssessmentResult),
}

impl Completion {
    pub fn result(&self) -> &AssessmentResult {
        match self {
            Completion::Finished(result) | Completion::AlreadyFinished(result) => result,
        }
    }

    pub fn into_result(self) -> AssessmentResult {
        match self {
            Completion::Finished(result) | Completion::AlreadyFinished(result) => result,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Completion::Finished(_))
    }
}

/// What a single countdown tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; the tick was ignored.
    Idle,
    /// Running but suspended; the countdown did not move.
    Paused { remaining_seconds: u32 },
    Running { remaining_seconds: u32 },
    /// The countdown hit zero and the engine submitted on the candidate's behalf.
    AutoSubmitted(AssessmentResult),
}

/// One running attempt at a quiz: answers, countdown, and scoring.
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    quiz: Quiz,
    result: AssessmentResult,
    remaining_seconds: u32,
    paused: bool,
}

impl AssessmentEngine {
    pub fn new(kind: QuizKind, quiz: Quiz) -> Self {
        let result = AssessmentResult::not_started(kind, &quiz);
        Self {
            remaining_seconds: quiz.time_limit_seconds(),
            quiz,
            result,
            paused: false,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<&AssessmentResult, AssessmentError> {
        if self.quiz.is_empty() {
            return Err(AssessmentError::EmptyQuiz);
        }
        if self.result.status != AssessmentStatus::NotStarted {
            return Err(AssessmentError::AlreadyStarted);
        }

        self.result.status = AssessmentStatus::InProgress;
        self.result.started_at = Some(now);
        self.remaining_seconds = self.quiz.time_limit_seconds();
        self.paused = false;
        Ok(&self.result)
    }

    /// Stores (or overwrites) the answer to one question.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        answer: AnswerValue,
    ) -> Result<AnswerOutcome, AssessmentError> {
        match self.result.status {
            AssessmentStatus::NotStarted => return Err(AssessmentError::NotStarted),
            AssessmentStatus::Completed | AssessmentStatus::Expired => {
                return Ok(AnswerOutcome::IgnoredFinished)
            }
            AssessmentStatus::InProgress => {}
        }

        let question = self
            .quiz
            .question(question_id)
            .ok_or(AssessmentError::UnknownQuestion(question_id))?;
        validate_answer(question_id, &question.kind, &answer)?;

        self.result.answers.insert(question_id, answer);
        Ok(AnswerOutcome::Recorded)
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.result.status != AssessmentStatus::InProgress {
            return TickOutcome::Idle;
        }
        if self.paused {
            return TickOutcome::Paused {
                remaining_seconds: self.remaining_seconds,
            };
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            };
        }

        debug!(
            kind = self.result.kind.as_str(),
            answered = self.result.answers.len(),
            "assessment countdown expired; auto-submitting"
        );
        self.finish(
            now,
            AssessmentStatus::Completed,
            CompletionReason::TimeExpired,
        );
        TickOutcome::AutoSubmitted(self.result.clone())
    }

    /// Candidate-initiated submission. Repeated calls return the frozen result.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<Completion, AssessmentError> {
        match self.result.status {
            AssessmentStatus::NotStarted => Err(AssessmentError::NotStarted),
            AssessmentStatus::Completed | AssessmentStatus::Expired => {
                Ok(Completion::AlreadyFinished(self.result.clone()))
            }
            AssessmentStatus::InProgress => {
                self.finish(now, AssessmentStatus::Completed, CompletionReason::Submitted);
                Ok(Completion::Finished(self.result.clone()))
            }
        }
    }

    /// Stops an in-flight attempt, keeping and scoring whatever was answered.
    /// Returns `None` when the attempt never started.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        match self.result.status {
            AssessmentStatus::NotStarted => None,
            AssessmentStatus::Completed | AssessmentStatus::Expired => {
                Some(Completion::AlreadyFinished(self.result.clone()))
            }
            AssessmentStatus::InProgress => {
                self.finish(now, AssessmentStatus::Expired, CompletionReason::Cancelled);
                Some(Completion::Finished(self.result.clone()))
            }
        }
    }

    /// Freezes the countdown. Status and answers are untouched.
    pub fn pause(&mut self) -> bool {
        if self.result.status != AssessmentStatus::InProgress || self.paused {
            return false;
        }
        self.paused = true;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.result.status != AssessmentStatus::InProgress || !self.paused {
            return false;
        }
        self.paused = false;
        true
    }

    pub fn result(&self) -> &AssessmentResult {
        &self.result
    }

    pub fn status(&self) -> AssessmentStatus {
        self.result.status
    }

    pub fn kind(&self) -> QuizKind {
        self.result.kind
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn finish(&mut self, now: DateTime<Utc>, status: AssessmentStatus, reason: CompletionReason) {
        let grade = scoring::grade(&self.quiz, &self.result.answers);

        self.result.score = grade.score;
        self.result.max_score = grade.max_score;
        self.result.percentage = grade.percentage;
        self.result.passed = grade.passed;
        self.result.manual_review = grade.manual_review;
        self.result.completed_at = Some(monotonic(now, self.result.started_at));
        self.result.completion = Some(reason);
        self.result.status = status;
        self.paused = false;
    }
}

fn validate_answer(
    question_id: QuestionId,
    kind: &QuestionKind,
    answer: &AnswerValue,
) -> Result<(), AssessmentError> {
    let mismatch = |expected: &'static str| AssessmentError::AnswerMismatch {
        question: question_id,
        expected,
    };

    match (kind, answer) {
        (QuestionKind::MultipleChoice { options, .. }, AnswerValue::Selected(index)) => {
            if (*index as usize) < options.len() {
                Ok(())
            } else {
                Err(mismatch("an index of one of the listed options"))
            }
        }
        (QuestionKind::MultipleChoice { .. }, AnswerValue::Text(_)) => {
            Err(mismatch("an option index"))
        }
        (QuestionKind::Rating { scale, .. }, AnswerValue::Selected(value)) => {
            if value <= scale {
                Ok(())
            } else {
                Err(mismatch("a rating within the scale"))
            }
        }
        (QuestionKind::Rating { .. }, AnswerValue::Text(_)) => Err(mismatch("a numeric rating")),
        (QuestionKind::Text | QuestionKind::Code { .. } | QuestionKind::Scenario, AnswerValue::Text(_)) => {
            Ok(())
        }
        (QuestionKind::Text | QuestionKind::Code { .. } | QuestionKind::Scenario, AnswerValue::Selected(_)) => {
            Err(mismatch("a written answer"))
        }
    }
}
