//! Deterministic offline question synthesis.
//!
//! Used when the provider is unreachable, unconfigured, or returns too few
//! usable questions. Output depends only on the inputs.

use crate::model::{Question, QuestionType, TRUE_FALSE_CHOICES};

const ASPECTS: [&str; 20] = [
    "fundamental concepts",
    "practical applications",
    "historical context",
    "key principles",
    "common misconceptions",
    "advanced topics",
    "real-world examples",
    "theoretical foundations",
    "core vocabulary",
    "major debates",
    "underlying assumptions",
    "everyday relevance",
    "notable figures",
    "methods of inquiry",
    "cause and effect relationships",
    "limitations",
    "connections to other subjects",
    "current research",
    "ethical considerations",
    "problem-solving strategies",
];

const TEMPLATES_PER_TYPE: usize = 5;

/// Distinct question texts per type before the cycle repeats.
pub const DISTINCT_PER_TYPE: usize = ASPECTS.len() * TEMPLATES_PER_TYPE;

/// Synthesize `count` questions about `topic`, cycling through
/// `allowed_types` in order. An empty type list yields nothing.
pub fn synthesize(topic: &str, count: usize, allowed_types: &[QuestionType]) -> Vec<Question> {
    synthesize_from(topic, 0, count, allowed_types)
}

/// Like [`synthesize`], but continue the cycle at position `start`.
///
/// `synthesize_from(t, 0, a + b, ts)` equals `synthesize(t, a, ts)` followed by
/// `synthesize_from(t, a, b, ts)`.
pub fn synthesize_from(
    topic: &str,
    start: usize,
    count: usize,
    allowed_types: &[QuestionType],
) -> Vec<Question> {
    if allowed_types.is_empty() {
        return Vec::new();
    }
    let topic = topic.trim();
    let n = allowed_types.len();
    (start..start + count)
        .map(|position| {
            let kind = allowed_types[position % n];
            // Ordinal of this item among items of the same type.
            let ordinal = position / n;
            synthesize_one(topic, kind, ordinal)
        })
        .collect()
}

fn synthesize_one(topic: &str, kind: QuestionType, ordinal: usize) -> Question {
    let aspect = ASPECTS[ordinal % ASPECTS.len()];
    let template = (ordinal / ASPECTS.len()) % TEMPLATES_PER_TYPE;

    match kind {
        QuestionType::MultipleChoice => {
            let text = match template {
                0 => format!("Which of the following best describes the {aspect} of {topic}?"),
                1 => format!("Which statement about the {aspect} of {topic} is most accurate?"),
                2 => format!("When studying {topic}, what characterizes its {aspect}?"),
                3 => format!("Which option is most closely tied to the {aspect} of {topic}?"),
                _ => format!("What would an expert single out as the {aspect} of {topic}?"),
            };
            let correct = format!("A central part of the {aspect} of {topic}");
            let mut choices = vec![
                correct.clone(),
                "A concept from an unrelated field".to_string(),
                format!("A popular but mistaken belief about {topic}"),
                "A historical footnote with no bearing on the topic".to_string(),
            ];
            let n = choices.len();
            choices.rotate_right(ordinal % n);
            Question {
                kind,
                text,
                choices: Some(choices),
                answer: Some(correct),
                explanation: Some(format!(
                    "This checks understanding of the {aspect} of {topic}."
                )),
            }
        }
        QuestionType::TrueFalse => {
            let text = match template {
                0 => format!("Understanding {topic} requires familiarity with its {aspect}."),
                1 => format!("The {aspect} of {topic} are worth studying in depth."),
                2 => format!("Learners of {topic} benefit from examining its {aspect}."),
                3 => format!("The {aspect} of {topic} connect to other areas of study."),
                _ => format!("A solid grasp of {topic} includes knowing its {aspect}."),
            };
            Question {
                kind,
                text,
                choices: Some(TRUE_FALSE_CHOICES.iter().map(|c| c.to_string()).collect()),
                answer: Some(TRUE_FALSE_CHOICES[0].to_string()),
                explanation: Some(format!("This statement about {topic} holds.")),
            }
        }
        QuestionType::ShortAnswer => {
            let text = match template {
                0 => format!("Explain the {aspect} of {topic}."),
                1 => format!("Describe how {topic} relates to its {aspect}."),
                2 => format!("Summarize the key points of {topic} with respect to its {aspect}."),
                3 => format!("Discuss why the {aspect} matter when learning {topic}."),
                _ => format!("Give an example that illustrates the {aspect} of {topic}."),
            };
            Question {
                kind,
                text,
                choices: None,
                answer: None,
                explanation: Some(format!(
                    "A good answer shows understanding of the {aspect} of {topic}."
                )),
            }
        }
    }
}
