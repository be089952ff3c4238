use std::collections::BTreeMap;

use super::quiz::{Question, QuestionId, QuestionKind, Quiz};
use super::result::AnswerValue;

/// Automatic grade for a set of answers against a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grade {
    pub(crate) score: u32,
    pub(crate) max_score: u32,
    pub(crate) percentage: u8,
    pub(crate) passed: bool,
    pub(crate) manual_review: Vec<QuestionId>,
}

/// Awards only points the engine can verify; everything else is queued for a human.
pub(crate) fn grade(quiz: &Quiz, answers: &BTreeMap<QuestionId, AnswerValue>) -> Grade {
    let mut score: u32 = 0;
    let mut manual_review = Vec::new();

    for question in quiz.questions() {
        let Some(answer) = answers.get(&question.id) else {
            continue;
        };

        match question_points(question, answer) {
            QuestionGrade::Awarded(points) => score = score.saturating_add(points),
            QuestionGrade::NeedsReview => manual_review.push(question.id),
        }
    }

    let max_score = quiz.total_points();
    let percentage = percentage(score, max_score);

    Grade {
        score,
        max_score,
        percentage,
        passed: percentage >= quiz.passing_score(),
        manual_review,
    }
}

/// `round(score / max_score * 100)`, with an empty point pool scoring zero.
pub(crate) fn percentage(score: u32, max_score: u32) -> u8 {
    if max_score == 0 {
        return 0;
    }
    let ratio = (f64::from(score) / f64::from(max_score)) * 100.0;
    ratio.round().clamp(0.0, 100.0) as u8
}

enum QuestionGrade {
    Awarded(u32),
    NeedsReview,
}

fn question_points(question: &Question, answer: &AnswerValue) -> QuestionGrade {
    match (&question.kind, answer) {
        (QuestionKind::MultipleChoice { correct_answer, .. }, AnswerValue::Selected(selected)) => {
            if selected == correct_answer {
                QuestionGrade::Awarded(question.points)
            } else {
                QuestionGrade::Awarded(0)
            }
        }
        (
            QuestionKind::Rating {
                target: Some(target),
                ..
            },
            AnswerValue::Selected(value),
        ) if *target > 0 => {
            let achieved = u64::from((*value).min(*target));
            let target = u64::from(*target);
            let points = u64::from(question.points);
            let awarded = (points * achieved + target / 2) / target;
            QuestionGrade::Awarded(awarded as u32)
        }
        (QuestionKind::Rating { .. }, _)
        | (QuestionKind::Text, _)
        | (QuestionKind::Code { .. }, _)
        | (QuestionKind::Scenario, _) => QuestionGrade::NeedsReview,
        (QuestionKind::MultipleChoice { .. }, AnswerValue::Text(_)) => QuestionGrade::Awarded(0),
    }
}
