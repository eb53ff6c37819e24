//! Grading completed quizzes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dedup::canonicalize;
use crate::model::{Difficulty, Question, QuestionType};

/// One graded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: Question,
    /// What the student chose or typed; `None` when skipped.
    #[serde(default)]
    pub selected: Option<String>,
    pub is_correct: bool,
}

/// A completed, graded quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_types: Vec<QuestionType>,
    /// Percentage in `0..=100`.
    pub score: u32,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub time_spent_secs: u64,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

impl QuizAttempt {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

/// Descriptive fields carried alongside the graded answers.
#[derive(Debug, Clone, Default)]
pub struct AttemptMeta {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub time_spent_secs: u64,
}

/// Qualitative rating of a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl ScoreBand {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => ScoreBand::Excellent,
            70..=89 => ScoreBand::Good,
            50..=69 => ScoreBand::Average,
            _ => ScoreBand::NeedsImprovement,
        }
    }

    /// CSS class used by the HTML exporter.
    pub fn css_class(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Average => "average",
            ScoreBand::NeedsImprovement => "poor",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Average => "Average",
            ScoreBand::NeedsImprovement => "Needs Improvement",
        })
    }
}

/// Whether `selected` answers `question` correctly.
///
/// Choice questions compare trimmed, case-insensitively against the answer.
/// Short-answer questions compare canonical forms and are never correct
/// without a reference answer.
pub fn is_correct(question: &Question, selected: Option<&str>) -> bool {
    let (Some(selected), Some(answer)) = (selected, question.answer.as_deref()) else {
        return false;
    };
    let selected = selected.trim();
    if selected.is_empty() {
        return false;
    }
    match question.kind {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            selected.to_lowercase() == answer.trim().to_lowercase()
        }
        QuestionType::ShortAnswer => canonicalize(selected) == canonicalize(answer),
    }
}

/// Percentage of correct answers, rounded half away from zero.
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

/// Grade a quiz. Missing trailing selections count as skipped.
pub fn grade_attempt(
    questions: &[Question],
    selected: &[Option<String>],
    meta: AttemptMeta,
) -> QuizAttempt {
    let answers: Vec<AnswerRecord> = questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let choice = selected.get(i).cloned().flatten();
            AnswerRecord {
                is_correct: is_correct(question, choice.as_deref()),
                question: question.clone(),
                selected: choice,
            }
        })
        .collect();

    let mut question_types: Vec<QuestionType> = Vec::new();
    for q in questions {
        if !question_types.contains(&q.kind) {
            question_types.push(q.kind);
        }
    }

    let total_questions = answers.len();
    let correct_answers = answers.iter().filter(|a| a.is_correct).count();

    QuizAttempt {
        id: Uuid::new_v4(),
        subject: meta.subject,
        topic: meta.topic,
        difficulty: meta.difficulty,
        question_types,
        score: percentage(correct_answers, total_questions),
        total_questions,
        correct_answers,
        time_spent_secs: meta.time_spent_secs,
        completed_at: Utc::now(),
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::synthesize;

    fn meta() -> AttemptMeta {
        AttemptMeta {
            subject: "Biology".into(),
            topic: "Cells".into(),
            difficulty: Difficulty::Easy,
            time_spent_secs: 120,
        }
    }

    #[test]
    fn bands() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(90), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(89), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(70), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(50), ScoreBand::Average);
        assert_eq!(ScoreBand::from_score(49), ScoreBand::NeedsImprovement);
        assert_eq!(ScoreBand::NeedsImprovement.to_string(), "Needs Improvement");
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn choice_answers_are_case_insensitive() {
        let qs = synthesize("Cells", 2, &[QuestionType::TrueFalse]);
        assert!(is_correct(&qs[0], Some(" true ")));
        assert!(!is_correct(&qs[0], Some("False")));
        assert!(!is_correct(&qs[0], None));
        assert!(!is_correct(&qs[0], Some("")));
    }

    #[test]
    fn short_answers_compare_canonically() {
        let q = Question {
            kind: QuestionType::ShortAnswer,
            text: "Powerhouse of the cell?".into(),
            choices: None,
            answer: Some("The mitochondria".into()),
            explanation: None,
        };
        assert!(is_correct(&q, Some("the Mitochondria!")));
        assert!(!is_correct(&q, Some("ribosome")));

        let open = Question { answer: None, ..q };
        assert!(!is_correct(&open, Some("anything")));
    }

    #[test]
    fn grades_a_mixed_quiz() {
        let qs = synthesize("Cells", 4, &QuestionType::ALL);
        let selected = vec![
            qs[0].answer.clone(),
            Some("False".to_string()),
            Some("whatever".to_string()),
        ];
        let attempt = grade_attempt(&qs, &selected, meta());

        assert_eq!(attempt.total_questions, 4);
        assert_eq!(attempt.correct_answers, 1);
        assert_eq!(attempt.score, 25);
        assert_eq!(attempt.band(), ScoreBand::NeedsImprovement);
        assert_eq!(
            attempt.question_types,
            [
                QuestionType::MultipleChoice,
                QuestionType::TrueFalse,
                QuestionType::ShortAnswer
            ]
        );
        assert_eq!(attempt.answers[3].selected, None);
        assert_eq!(attempt.subject, "Biology");
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let attempt = grade_attempt(&[], &[], meta());
        assert_eq!(attempt.score, 0);
        assert_eq!(attempt.total_questions, 0);
    }
}
