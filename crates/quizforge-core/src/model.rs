//! Core data model types for quizforge.
//!
//! These are the types the whole pipeline passes around: question kinds,
//! difficulty levels, generated questions, and the normalized request that
//! drives a generation run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// Upper bound on questions per generation request.
pub const MAX_QUESTIONS: usize = 100;

/// Question count used when the caller passes zero or a negative number.
pub const DEFAULT_QUESTION_COUNT: usize = 5;

/// The literals every true/false question uses as its choices.
pub const TRUE_FALSE_CHOICES: [&str; 2] = ["True", "False"];

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "mcq", alias = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "tf", alias = "true-false")]
    TrueFalse,
    #[serde(rename = "short", alias = "short-answer")]
    ShortAnswer,
}

impl QuestionType {
    /// All kinds, in the order used when a request does not restrict them.
    pub const ALL: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    /// Short wire name used in prompts and JSON (`mcq`, `tf`, `short`).
    pub fn wire_name(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "mcq",
            QuestionType::TrueFalse => "tf",
            QuestionType::ShortAnswer => "short",
        }
    }

    /// Whether questions of this kind carry a choice list.
    pub fn has_choices(self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::TrueFalse => write!(f, "true-false"),
            QuestionType::ShortAnswer => write!(f, "short-answer"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "mcq" | "multiplechoice" | "mc" => Ok(QuestionType::MultipleChoice),
            "tf" | "truefalse" | "boolean" => Ok(QuestionType::TrueFalse),
            "short" | "shortanswer" | "sa" => Ok(QuestionType::ShortAnswer),
            _ => Err(format!("unknown question type: {}", s.trim())),
        }
    }
}

/// Difficulty level requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A single quiz question as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question kind.
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Question text shown to the student.
    #[serde(rename = "question")]
    pub text: String,
    /// Ordered choices (absent for short-answer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Correct answer; one of `choices` when choices are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Optional explanation or sample answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Check the invariants every emitted question must satisfy.
    ///
    /// Multiple-choice needs at least four choices with the answer among
    /// them, true/false needs exactly the canonical literals, short-answer
    /// carries no choices. Text is never blank.
    pub fn is_well_formed(&self) -> bool {
        if self.text.trim().is_empty() {
            return false;
        }
        match self.kind {
            QuestionType::MultipleChoice => match (&self.choices, &self.answer) {
                (Some(choices), Some(answer)) => choices.len() >= 4 && choices.contains(answer),
                _ => false,
            },
            QuestionType::TrueFalse => {
                let canonical = self
                    .choices
                    .as_ref()
                    .is_some_and(|c| c.len() == 2 && c[0] == "True" && c[1] == "False");
                canonical
                    && self
                        .answer
                        .as_deref()
                        .is_some_and(|a| TRUE_FALSE_CHOICES.contains(&a))
            }
            QuestionType::ShortAnswer => self.choices.is_none(),
        }
    }
}

/// The `{ "questions": [...] }` payload handed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub questions: Vec<Question>,
}

/// A normalized generation request.
///
/// Construct through [`GenerationRequest::new`], which applies the defaults
/// and clamps; fields are public for inspection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Trimmed, non-empty topic.
    pub topic: String,
    /// Number of questions to return, in `1..=MAX_QUESTIONS`.
    pub question_count: usize,
    /// Allowed kinds; never empty, no duplicates.
    pub allowed_types: Vec<QuestionType>,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

impl GenerationRequest {
    /// Build a request, applying the defaults.
    ///
    /// A non-positive count becomes [`DEFAULT_QUESTION_COUNT`], counts above
    /// [`MAX_QUESTIONS`] are clamped, an empty type list means all kinds, and
    /// a missing difficulty means medium.
    pub fn new(
        topic: &str,
        question_count: i64,
        types: &[QuestionType],
        difficulty: Option<Difficulty>,
    ) -> Result<Self, RequestError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RequestError::EmptyTopic);
        }

        let question_count = if question_count <= 0 {
            DEFAULT_QUESTION_COUNT
        } else {
            (question_count as u64).min(MAX_QUESTIONS as u64) as usize
        };

        let mut allowed_types = Vec::with_capacity(3);
        for t in types {
            if !allowed_types.contains(t) {
                allowed_types.push(*t);
            }
        }
        if allowed_types.is_empty() {
            allowed_types = QuestionType::ALL.to_vec();
        }

        Ok(Self {
            topic: topic.to_string(),
            question_count,
            allowed_types,
            difficulty: difficulty.unwrap_or_default(),
        })
    }

    /// Whether `kind` is one of the requested kinds.
    pub fn allows(&self, kind: QuestionType) -> bool {
        self.allowed_types.contains(&kind)
    }
}

/// Parse a comma-separated list of question types (e.g. "mcq,tf").
pub fn parse_type_list(s: &str) -> Result<Vec<QuestionType>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(answer: &str) -> Question {
        Question {
            kind: QuestionType::MultipleChoice,
            text: "What is 2 + 2?".into(),
            choices: Some(vec!["3".into(), "4".into(), "5".into(), "6".into()]),
            answer: Some(answer.into()),
            explanation: None,
        }
    }

    #[test]
    fn question_type_display_and_parse() {
        assert_eq!(QuestionType::MultipleChoice.to_string(), "multiple-choice");
        assert_eq!("mcq".parse::<QuestionType>().unwrap(), QuestionType::MultipleChoice);
        assert_eq!(
            "Multiple Choice".parse::<QuestionType>().unwrap(),
            QuestionType::MultipleChoice
        );
        assert_eq!("true/false".parse::<QuestionType>().unwrap(), QuestionType::TrueFalse);
        assert_eq!(
            "short_answer".parse::<QuestionType>().unwrap(),
            QuestionType::ShortAnswer
        );
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn question_serializes_with_wire_names() {
        let json = serde_json::to_value(mcq("4")).unwrap();
        assert_eq!(json["type"], "mcq");
        assert_eq!(json["question"], "What is 2 + 2?");
        assert!(json.get("explanation").is_none());

        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back, mcq("4"));
    }

    #[test]
    fn long_type_names_deserialize() {
        let q: Question = serde_json::from_str(
            r#"{"type": "short-answer", "question": "Explain gravity."}"#,
        )
        .unwrap();
        assert_eq!(q.kind, QuestionType::ShortAnswer);
        assert!(q.is_well_formed());
    }

    #[test]
    fn well_formed_checks() {
        assert!(mcq("4").is_well_formed());
        assert!(!mcq("7").is_well_formed());

        let tf = Question {
            kind: QuestionType::TrueFalse,
            text: "The sky is blue.".into(),
            choices: Some(vec!["True".into(), "False".into()]),
            answer: Some("True".into()),
            explanation: None,
        };
        assert!(tf.is_well_formed());

        let bad_tf = Question {
            choices: Some(vec!["Yes".into(), "No".into()]),
            ..tf.clone()
        };
        assert!(!bad_tf.is_well_formed());

        let blank = Question {
            text: "   ".into(),
            ..tf
        };
        assert!(!blank.is_well_formed());
    }

    #[test]
    fn request_defaults() {
        let req = GenerationRequest::new("  Algebra ", 0, &[], None).unwrap();
        assert_eq!(req.topic, "Algebra");
        assert_eq!(req.question_count, DEFAULT_QUESTION_COUNT);
        assert_eq!(req.allowed_types, QuestionType::ALL.to_vec());
        assert_eq!(req.difficulty, Difficulty::Medium);
    }

    #[test]
    fn request_clamps_and_dedupes() {
        let req = GenerationRequest::new(
            "Algebra",
            1_000,
            &[QuestionType::TrueFalse, QuestionType::TrueFalse],
            Some(Difficulty::Hard),
        )
        .unwrap();
        assert_eq!(req.question_count, MAX_QUESTIONS);
        assert_eq!(req.allowed_types, vec![QuestionType::TrueFalse]);
        assert!(req.allows(QuestionType::TrueFalse));
        assert!(!req.allows(QuestionType::ShortAnswer));
    }

    #[test]
    fn request_rejects_blank_topic() {
        assert!(matches!(
            GenerationRequest::new("   ", 5, &[], None),
            Err(RequestError::EmptyTopic)
        ));
    }

    #[test]
    fn type_list_parsing() {
        assert_eq!(
            parse_type_list("mcq, tf").unwrap(),
            vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]
        );
        assert!(parse_type_list("mcq,essay").is_err());
        assert!(parse_type_list("").unwrap().is_empty());
    }
}
