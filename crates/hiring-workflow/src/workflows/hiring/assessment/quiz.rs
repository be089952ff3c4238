use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a question, unique within its quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two assessments attached to a job a quiz belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    Technical,
    Hr,
}

impl QuizKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Hr => "hr",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Technical => "Technical",
            Self::Hr => "HR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "technical" | "tech" => Some(Self::Technical),
            "hr" => Some(Self::Hr),
            _ => None,
        }
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question shape and the data needed to grade it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_answer: u32,
    },
    Text,
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Rating {
        scale: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<u32>,
    },
    Scenario,
}

impl QuestionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice { .. } => "multiple-choice",
            Self::Text => "text",
            Self::Code { .. } => "code",
            Self::Rating { .. } => "rating",
            Self::Scenario => "scenario",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub points: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// A question that has not been placed in a quiz yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub prompt: String,
    pub points: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl QuestionDraft {
    pub fn multiple_choice(
        prompt: impl Into<String>,
        points: u32,
        options: Vec<String>,
        correct_answer: u32,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            points,
            kind: QuestionKind::MultipleChoice {
                options,
                correct_answer,
            },
        }
    }

    pub fn text(prompt: impl Into<String>, points: u32) -> Self {
        Self {
            prompt: prompt.into(),
            points,
            kind: QuestionKind::Text,
        }
    }

    pub fn rating(prompt: impl Into<String>, points: u32, scale: u32, target: Option<u32>) -> Self {
        Self {
            prompt: prompt.into(),
            points,
            kind: QuestionKind::Rating { scale, target },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizDefinitionError {
    #[error("question id {0} appears more than once")]
    DuplicateQuestionId(QuestionId),
    #[error("passing score must be between 0 and 100 (found {0})")]
    PassingScoreOutOfRange(u32),
    #[error("question ids are exhausted at {0}")]
    QuestionIdExhausted(QuestionId),
}

/// Ordered, point-weighted question set with a time limit and passing threshold.
///
/// `total_points` is derived state: every edit recomputes it, and deserialization ignores
/// whatever total the payload claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizPayload", into = "QuizPayload")]
pub struct Quiz {
    questions: Vec<Question>,
    time_limit_minutes: u32,
    passing_score: u8,
    total_points: u32,
    next_question_id: u32,
}

impl Quiz {
    /// Creates an empty quiz; `passing_score` is a percentage and is capped at 100.
    pub fn new(time_limit_minutes: u32, passing_score: u8) -> Self {
        Self {
            questions: Vec::new(),
            time_limit_minutes,
            passing_score: passing_score.min(100),
            total_points: 0,
            next_question_id: 1,
        }
    }

    /// Builds a quiz from drafts, numbering the questions from 1 in order.
    pub fn from_drafts(
        time_limit_minutes: u32,
        passing_score: u8,
        drafts: impl IntoIterator<Item = QuestionDraft>,
    ) -> Result<Self, QuizDefinitionError> {
        let mut quiz = Self::new(time_limit_minutes, passing_score);
        for draft in drafts {
            quiz.add_question(draft)?;
        }
        Ok(quiz)
    }

    /// Appends a question under the next unused id. Ids are never handed out twice, so a
    /// quiz whose counter reached `u32::MAX` refuses further questions.
    pub fn add_question(&mut self, draft: QuestionDraft) -> Result<QuestionId, QuizDefinitionError> {
        let id = QuestionId(self.next_question_id);
        self.next_question_id = self
            .next_question_id
            .checked_add(1)
            .ok_or(QuizDefinitionError::QuestionIdExhausted(id))?;
        self.questions.push(Question {
            id,
            prompt: draft.prompt,
            points: draft.points,
            kind: draft.kind,
        });
        self.recompute_total();
        Ok(id)
    }

    pub fn remove_question(&mut self, id: QuestionId) -> Option<Question> {
        let index = self.questions.iter().position(|question| question.id == id)?;
        let removed = self.questions.remove(index);
        self.recompute_total();
        Some(removed)
    }

    /// Re-weights a question, returning `false` when the id is unknown.
    pub fn set_points(&mut self, id: QuestionId, points: u32) -> bool {
        let Some(question) = self.questions.iter_mut().find(|question| question.id == id) else {
            return false;
        };
        question.points = points;
        self.recompute_total();
        true
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    fn recompute_total(&mut self) {
        self.total_points = self
            .questions
            .iter()
            .fold(0u32, |total, question| total.saturating_add(question.points));
    }
}

#[derive(Serialize, Deserialize)]
struct QuizPayload {
    questions: Vec<Question>,
    time_limit_minutes: u32,
    passing_score: u32,
    #[serde(default)]
    total_points: u32,
}

impl TryFrom<QuizPayload> for Quiz {
    type Error = QuizDefinitionError;

    fn try_from(payload: QuizPayload) -> Result<Self, Self::Error> {
        if payload.passing_score > 100 {
            return Err(QuizDefinitionError::PassingScoreOutOfRange(
                payload.passing_score,
            ));
        }

        let mut seen = BTreeSet::new();
        for question in &payload.questions {
            if !seen.insert(question.id) {
                return Err(QuizDefinitionError::DuplicateQuestionId(question.id));
            }
        }

        let next_question_id = match seen.iter().next_back() {
            Some(last) => last
                .0
                .checked_add(1)
                .ok_or(QuizDefinitionError::QuestionIdExhausted(*last))?,
            None => 1,
        };
        let mut quiz = Self {
            questions: payload.questions,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score as u8,
            total_points: 0,
            next_question_id,
        };
        quiz.recompute_total();
        Ok(quiz)
    }
}

impl From<Quiz> for QuizPayload {
    fn from(quiz: Quiz) -> Self {
        Self {
            total_points: quiz.total_points,
            questions: quiz.questions,
            time_limit_minutes: quiz.time_limit_minutes,
            passing_score: u32::from(quiz.passing_score),
        }
    }
}
