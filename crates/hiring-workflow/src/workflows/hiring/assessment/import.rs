use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::quiz::{QuestionDraft, QuestionKind, Quiz};

#[derive(Debug)]
pub enum QuizImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for QuizImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizImportError::Io(err) => write!(f, "failed to read question bank: {}", err),
            QuizImportError::Csv(err) => write!(f, "invalid question bank CSV data: {}", err),
            QuizImportError::InvalidRow { line, reason } => {
                write!(f, "question bank line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for QuizImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuizImportError::Io(err) => Some(err),
            QuizImportError::Csv(err) => Some(err),
            QuizImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for QuizImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for QuizImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Builds a [`Quiz`] from a CSV question bank.
///
/// Expected headers: `Type, Prompt, Points, Options, Correct Answer, Scale, Target`.
/// `Options` are `|`-separated; `Correct Answer` may be the option index or its text.
pub struct QuizImporter;

impl QuizImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        time_limit_minutes: u32,
        passing_score: u8,
    ) -> Result<Quiz, QuizImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, time_limit_minutes, passing_score)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        time_limit_minutes: u32,
        passing_score: u8,
    ) -> Result<Quiz, QuizImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut quiz = Quiz::new(time_limit_minutes, passing_score);

        // Line numbers count the header as line 1.
        for (index, record) in csv_reader.deserialize::<QuestionRow>().enumerate() {
            let row = record?;
            let draft = row.into_draft().map_err(|reason| QuizImportError::InvalidRow {
                line: index as u64 + 2,
                reason,
            })?;
            quiz.add_question(draft).map_err(|err| QuizImportError::InvalidRow {
                line: index as u64 + 2,
                reason: err.to_string(),
            })?;
        }

        Ok(quiz)
    }
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Prompt")]
    prompt: String,
    #[serde(rename = "Points")]
    points: u32,
    #[serde(rename = "Options", default, deserialize_with = "empty_string_as_none")]
    options: Option<String>,
    #[serde(
        rename = "Correct Answer",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    correct_answer: Option<String>,
    #[serde(rename = "Scale", default, deserialize_with = "empty_string_as_none")]
    scale: Option<String>,
    #[serde(rename = "Target", default, deserialize_with = "empty_string_as_none")]
    target: Option<String>,
}

impl QuestionRow {
    fn into_draft(self) -> Result<QuestionDraft, String> {
        if self.prompt.is_empty() {
            return Err("prompt is empty".to_string());
        }

        let kind = match self.kind.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "multiple-choice" | "mcq" => {
                let options: Vec<String> = self
                    .options
                    .as_deref()
                    .unwrap_or_default()
                    .split('|')
                    .map(|option| option.trim().to_string())
                    .filter(|option| !option.is_empty())
                    .collect();
                if options.len() < 2 {
                    return Err("multiple-choice questions need at least two options".to_string());
                }
                let correct_answer = resolve_correct_answer(&options, self.correct_answer.as_deref())?;
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                }
            }
            "text" => QuestionKind::Text,
            "code" => QuestionKind::Code { language: None },
            "scenario" => QuestionKind::Scenario,
            "rating" => {
                let scale = match self.scale.as_deref() {
                    Some(raw) => parse_number(raw, "Scale")?,
                    None => 5,
                };
                let target = self
                    .target
                    .as_deref()
                    .map(|raw| parse_number(raw, "Target"))
                    .transpose()?;
                if target.is_some_and(|target| target > scale) {
                    return Err("rating target exceeds the scale".to_string());
                }
                QuestionKind::Rating { scale, target }
            }
            other => return Err(format!("unknown question type '{other}'")),
        };

        Ok(QuestionDraft {
            prompt: self.prompt,
            points: self.points,
            kind,
        })
    }
}

fn resolve_correct_answer(options: &[String], raw: Option<&str>) -> Result<u32, String> {
    let raw = raw.ok_or_else(|| "multiple-choice questions need a correct answer".to_string())?;

    if let Ok(index) = raw.parse::<u32>() {
        if (index as usize) < options.len() {
            return Ok(index);
        }
    }

    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(raw))
        .map(|index| index as u32)
        .ok_or_else(|| format!("correct answer '{raw}' is not one of the options"))
}

fn parse_number(raw: &str, column: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|_| format!("{column} must be a non-negative integer (found '{raw}')"))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
