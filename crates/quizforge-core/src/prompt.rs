//! Prompt construction for question generation.

use crate::model::{Difficulty, QuestionType};

/// Build the instruction prompt for one generation call.
///
/// A single requested type gets repeated, explicit constraints plus a worked
/// example for that type only, since models tend to drift into other types
/// under a permissive prompt. Several types get an even-distribution
/// instruction instead.
pub fn build_prompt(
    topic: &str,
    count: usize,
    allowed_types: &[QuestionType],
    difficulty: Difficulty,
) -> String {
    let single = match allowed_types {
        [only] => Some(*only),
        _ => None,
    };

    let type_names = allowed_types
        .iter()
        .map(|t| t.wire_name())
        .collect::<Vec<_>>()
        .join(", ");

    let (type_instructions, example_format) = match single {
        Some(kind) => (single_type_instructions(kind), example_for(kind).to_string()),
        None => (
            format!("Distribute questions evenly across these types: {type_names}"),
            format!(
                "Mix of {type_names} questions, each shaped like one of:\n{}",
                allowed_types
                    .iter()
                    .map(|t| example_for(*t))
                    .collect::<Vec<_>>()
                    .join(",\n")
            ),
        ),
    };

    let strict = match single {
        Some(kind) => format!(
            "\nSTRICT TYPE REQUIREMENT: ALL {count} questions MUST have type=\"{}\"\n",
            kind.wire_name()
        ),
        None => String::new(),
    };

    format!(
        "You are an expert educational content creator. Generate {count} UNIQUE, NON-REPETITIVE educational questions about \"{topic}\".

CRITICAL REQUIREMENTS:
1. Difficulty level: {difficulty}
2. {type_instructions}
3. Each question MUST be UNIQUE - no repeated questions
4. Each question MUST be DIFFERENT from others
5. Cover DIFFERENT aspects of the topic
{strict}
Question Format:
{example_format}

Return ONLY a valid JSON object (no markdown, no code blocks, no extra text):
{{
  \"questions\": [
    // {count} unique questions here
  ]
}}

Generate exactly {count} UNIQUE questions now:"
    )
}

fn single_type_instructions(kind: QuestionType) -> String {
    match kind {
        QuestionType::MultipleChoice => "Generate ONLY multiple choice questions. EVERY SINGLE question must have:
- type: \"mcq\"
- 4 different options
- One correct answer
NO true/false questions. NO short answer questions. ONLY multiple choice."
            .to_string(),
        QuestionType::TrueFalse => "Generate ONLY true/false questions. EVERY SINGLE question must have:
- type: \"tf\"
- 2 options: True and False
- Correct answer (True or False)
NO multiple choice questions. NO short answer questions. ONLY true/false."
            .to_string(),
        QuestionType::ShortAnswer => "Generate ONLY short answer questions. EVERY SINGLE question must have:
- type: \"short\"
- Open-ended question
- Sample answer in explanation
NO multiple choice questions. NO true/false questions. ONLY short answer."
            .to_string(),
    }
}

fn example_for(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::MultipleChoice => {
            r#"{
  "type": "mcq",
  "question": "What is...?",
  "choices": ["Option A", "Option B", "Option C", "Option D"],
  "answer": "Option A",
  "explanation": "Explanation here"
}"#
        }
        QuestionType::TrueFalse => {
            r#"{
  "type": "tf",
  "question": "Statement to evaluate",
  "choices": ["True", "False"],
  "answer": "True",
  "explanation": "Explanation here"
}"#
        }
        QuestionType::ShortAnswer => {
            r#"{
  "type": "short",
  "question": "Explain...",
  "explanation": "Sample answer here"
}"#
        }
    }
}
