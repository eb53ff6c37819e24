//! Model output parser and question validator.
//!
//! Provider output is untrusted free text. This module locates the JSON
//! object in it, checks the `questions` array, drops entries of the wrong
//! type, and repairs (or rejects, depending on [`ValidationPolicy`]) entries
//! that are structurally incomplete.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::model::{Question, QuestionType, TRUE_FALSE_CHOICES};

/// Placeholder labels used to pad multiple-choice questions.
const PLACEHOLDER_CHOICES: [&str; 4] = ["Option A", "Option B", "Option C", "Option D"];

/// Minimum number of choices on an emitted multiple-choice question.
pub const MIN_MCQ_CHOICES: usize = 4;

/// What to do with entries whose shape is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Pad choices, normalize answers, and fill blank text.
    #[default]
    Repair,
    /// Drop multiple-choice entries with fewer than 2 choices, true/false
    /// entries without exactly 2 choices, and entries whose answer matches
    /// no choice. Surviving entries are still normalized.
    Reject,
}

/// Intermediate, loosely-typed view of one generated entry.
#[derive(Debug, Default, Deserialize)]
struct RawQuestion {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default, alias = "text")]
    question: Option<Value>,
    #[serde(default, alias = "options")]
    choices: Option<Value>,
    #[serde(default, alias = "correctAnswer", alias = "correct_answer")]
    answer: Option<Value>,
    #[serde(default)]
    explanation: Option<Value>,
}

/// Why an entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    Malformed(String),
    UnknownType(String),
    DisallowedType(QuestionType),
    TooFewChoices(usize),
    WrongTrueFalseChoices(usize),
    UnmatchedAnswer(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed(e) => write!(f, "malformed entry: {e}"),
            Rejection::UnknownType(t) => write!(f, "unknown type \"{t}\""),
            Rejection::DisallowedType(t) => write!(f, "type {t} was not requested"),
            Rejection::TooFewChoices(n) => write!(f, "multiple-choice with {n} choices"),
            Rejection::WrongTrueFalseChoices(n) => write!(f, "true/false with {n} choices"),
            Rejection::UnmatchedAnswer(a) => write!(f, "answer \"{a}\" matches no choice"),
        }
    }
}

/// Parse raw model output into validated questions.
///
/// Fails only when no JSON object can be found or it lacks a `questions`
/// array; individual bad entries are filtered or repaired and logged.
pub fn parse_response(
    raw: &str,
    allowed_types: &[QuestionType],
    topic: &str,
    policy: ValidationPolicy,
) -> Result<Vec<Question>, ParseError> {
    let value = extract_json_object(raw).ok_or(ParseError::NoJsonObject)?;
    let entries = value
        .get("questions")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingQuestions)?;

    let mut questions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let ordinal = questions.len() + 1;
        match validate_entry(entry, allowed_types, topic, ordinal, policy) {
            Ok(question) => questions.push(question),
            Err(reason) => {
                tracing::warn!(index, %reason, "filtered generated question");
            }
        }
    }

    if questions.len() < entries.len() {
        tracing::debug!(
            kept = questions.len(),
            total = entries.len(),
            "some generated questions were filtered"
        );
    }

    Ok(questions)
}

/// Locate the first JSON object in free text.
///
/// Tries the span from the first `{` to the last `}` first, then falls back
/// to scanning for a balanced, string-aware object starting at each `{`.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    if last > first {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&raw[first..=last]) {
            return Some(value);
        }
    }

    for (start, _) in raw.match_indices('{') {
        if let Some(end) = balanced_object_end(&raw[start..]) {
            if let Ok(value @ Value::Object(_)) =
                serde_json::from_str::<Value>(&raw[start..start + end])
            {
                return Some(value);
            }
        }
    }

    None
}

/// Byte length of the balanced `{...}` at the start of `s`, if any.
fn balanced_object_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate_entry(
    entry: &Value,
    allowed_types: &[QuestionType],
    topic: &str,
    ordinal: usize,
    policy: ValidationPolicy,
) -> Result<Question, Rejection> {
    if !entry.is_object() {
        return Err(Rejection::Malformed("not an object".into()));
    }
    let raw = RawQuestion::deserialize(entry).map_err(|e| Rejection::Malformed(e.to_string()))?;

    let kind = resolve_kind(raw.kind.as_ref(), allowed_types)?;
    let choices: Vec<String> = match &raw.choices {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    };
    let answer = raw.answer.as_ref().and_then(scalar_to_string);

    if policy == ValidationPolicy::Reject {
        match kind {
            QuestionType::MultipleChoice if choices.len() < 2 => {
                return Err(Rejection::TooFewChoices(choices.len()));
            }
            QuestionType::TrueFalse if choices.len() != 2 => {
                return Err(Rejection::WrongTrueFalseChoices(choices.len()));
            }
            _ => {}
        }
    }

    let text = raw
        .question
        .as_ref()
        .and_then(scalar_to_string)
        .unwrap_or_else(|| format!("Question {ordinal} about {topic}"));

    let (choices, answer) = match kind {
        QuestionType::MultipleChoice => {
            let (choices, answer) = repair_multiple_choice(choices, answer, policy)?;
            (Some(choices), Some(answer))
        }
        QuestionType::TrueFalse => {
            let answer = repair_true_false(&choices, answer, policy)?;
            (
                Some(TRUE_FALSE_CHOICES.iter().map(|c| c.to_string()).collect()),
                Some(answer),
            )
        }
        QuestionType::ShortAnswer => (None, answer),
    };

    Ok(Question {
        kind,
        text,
        choices,
        answer,
        explanation: raw.explanation.as_ref().and_then(scalar_to_string),
    })
}

/// Declared type → allowed kind. A missing type is assigned the first
/// allowed kind; an unknown or unrequested one is rejected.
fn resolve_kind(
    declared: Option<&Value>,
    allowed_types: &[QuestionType],
) -> Result<QuestionType, Rejection> {
    let fallback = allowed_types
        .first()
        .copied()
        .unwrap_or(QuestionType::MultipleChoice);

    let Some(name) = declared.and_then(scalar_to_string) else {
        return Ok(fallback);
    };

    let kind: QuestionType = name
        .parse()
        .map_err(|_| Rejection::UnknownType(name.clone()))?;

    if allowed_types.contains(&kind) {
        Ok(kind)
    } else {
        Err(Rejection::DisallowedType(kind))
    }
}

fn repair_multiple_choice(
    mut choices: Vec<String>,
    answer: Option<String>,
    policy: ValidationPolicy,
) -> Result<(Vec<String>, String), Rejection> {
    let original_len = choices.len();
    while choices.len() < MIN_MCQ_CHOICES {
        choices.push(PLACEHOLDER_CHOICES[choices.len()].to_string());
    }

    let Some(answer) = answer else {
        let first = choices[0].clone();
        return Ok((choices, first));
    };

    if let Some(index) = match_choice(&answer, &choices) {
        let resolved = choices[index].clone();
        return Ok((choices, resolved));
    }

    if policy == ValidationPolicy::Reject {
        return Err(Rejection::UnmatchedAnswer(answer));
    }

    // Keep every model-supplied distractor: take a padded slot if there is
    // one, otherwise append.
    if original_len < MIN_MCQ_CHOICES {
        choices[original_len] = answer.clone();
    } else {
        choices.push(answer.clone());
    }
    Ok((choices, answer))
}

fn repair_true_false(
    raw_choices: &[String],
    answer: Option<String>,
    policy: ValidationPolicy,
) -> Result<String, Rejection> {
    let Some(answer) = answer else {
        return Ok(TRUE_FALSE_CHOICES[0].to_string());
    };

    // "A"/"B" refer to the model's own choice order.
    let via_letter = letter_index(&answer)
        .and_then(|i| raw_choices.get(i))
        .and_then(|c| truth_value(c));

    match truth_value(&answer).or(via_letter) {
        Some(true) => Ok(TRUE_FALSE_CHOICES[0].to_string()),
        Some(false) => Ok(TRUE_FALSE_CHOICES[1].to_string()),
        None if policy == ValidationPolicy::Reject => Err(Rejection::UnmatchedAnswer(answer)),
        None => Ok(TRUE_FALSE_CHOICES[0].to_string()),
    }
}

fn truth_value(s: &str) -> Option<bool> {
    match s.trim().trim_end_matches('.').to_lowercase().as_str() {
        "true" | "t" | "yes" | "correct" => Some(true),
        "false" | "f" | "no" | "incorrect" => Some(false),
        _ => None,
    }
}

/// Index of the choice an answer refers to: exact text, case-insensitive
/// text, then a letter label like `B`, `(c)` or `d.`.
fn match_choice(answer: &str, choices: &[String]) -> Option<usize> {
    if let Some(i) = choices.iter().position(|c| c == answer) {
        return Some(i);
    }
    let needle = answer.trim().to_lowercase();
    if let Some(i) = choices
        .iter()
        .position(|c| c.trim().to_lowercase() == needle)
    {
        return Some(i);
    }
    letter_index(answer).filter(|&i| i < choices.len())
}

fn letter_index(answer: &str) -> Option<usize> {
    let label = answer
        .trim()
        .trim_start_matches('(')
        .trim_end_matches([')', '.', ':']);
    let mut chars = label.chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii_alphabetic() {
        return None;
    }
    Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
}

/// Stringify a JSON scalar; blank strings and containers yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Bool(true) => TRUE_FALSE_CHOICES[0].to_string(),
        Value::Bool(false) => TRUE_FALSE_CHOICES[1].to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
