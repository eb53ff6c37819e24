//! Aggregate statistics over a student's quiz history.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attempt::{QuizAttempt, ScoreBand};

/// Points of change in mean score needed before a trend is reported.
pub const TREND_DEAD_BAND: f64 = 5.0;

/// Direction of a subject's scores over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        })
    }
}

/// Totals across every attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_quizzes: usize,
    pub average_score: u32,
    pub best_score: u32,
    pub total_time_secs: u64,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Correct answers as a percentage of all questions.
    pub accuracy: u32,
}

/// Performance within one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub total_quizzes: usize,
    pub average_score: u32,
    pub best_score: u32,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub trend: Trend,
}

impl SubjectPerformance {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.average_score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub overall: OverallStats,
    /// Subjects in order of first appearance.
    pub subjects: Vec<SubjectPerformance>,
}

fn mean(scores: &[u32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64
}

/// Compare the later half of `scores` against the earlier half.
pub fn trend(scores: &[u32]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let (earlier, later) = scores.split_at(scores.len() / 2);
    let delta = mean(later) - mean(earlier);
    if delta > TREND_DEAD_BAND {
        Trend::Improving
    } else if delta < -TREND_DEAD_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Summarize attempts, which must be in completion order.
pub fn summarize(quizzes: &[QuizAttempt]) -> AnalyticsSummary {
    let scores: Vec<u32> = quizzes.iter().map(|q| q.score).collect();
    let total_questions = quizzes.iter().map(|q| q.total_questions).sum();
    let correct_answers = quizzes.iter().map(|q| q.correct_answers).sum();

    let overall = OverallStats {
        total_quizzes: quizzes.len(),
        average_score: mean(&scores).round() as u32,
        best_score: scores.iter().copied().max().unwrap_or(0),
        total_time_secs: quizzes.iter().map(|q| q.time_spent_secs).sum(),
        total_questions,
        correct_answers,
        accuracy: crate::attempt::percentage(correct_answers, total_questions),
    };

    let mut order: Vec<&str> = Vec::new();
    for q in quizzes {
        if !order.contains(&q.subject.as_str()) {
            order.push(&q.subject);
        }
    }

    let subjects = order
        .into_iter()
        .map(|subject| {
            let attempts: Vec<&QuizAttempt> =
                quizzes.iter().filter(|q| q.subject == subject).collect();
            let scores: Vec<u32> = attempts.iter().map(|q| q.score).collect();
            SubjectPerformance {
                subject: subject.to_string(),
                total_quizzes: attempts.len(),
                average_score: mean(&scores).round() as u32,
                best_score: scores.iter().copied().max().unwrap_or(0),
                total_questions: attempts.iter().map(|q| q.total_questions).sum(),
                correct_answers: attempts.iter().map(|q| q.correct_answers).sum(),
                trend: trend(&scores),
            }
        })
        .collect();

    AnalyticsSummary { overall, subjects }
}

/// Format seconds as `1h 5m` or `12m`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}
