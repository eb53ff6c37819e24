//! The `quizforge grade` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Deserialize;

use quizforge_core::attempt::{grade_attempt, AttemptMeta, QuizAttempt};
use quizforge_core::model::{Difficulty, GenerationOutput, Question};
use quizforge_report::html::write_attempt_html;

use super::open_store;

pub struct GradeArgs {
    pub questions: PathBuf,
    pub answers: PathBuf,
    pub subject: String,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_spent: u64,
    pub export: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Accepted shapes of a questions file.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsFile {
    Wrapped(GenerationOutput),
    Bare(Vec<Question>),
}

fn read_questions(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: QuestionsFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse questions in {}", path.display()))?;
    Ok(match file {
        QuestionsFile::Wrapped(output) => output.questions,
        QuestionsFile::Bare(questions) => questions,
    })
}

fn read_answers(path: &Path) -> Result<Vec<Option<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers in {}", path.display()))
}

pub fn execute(args: GradeArgs) -> Result<()> {
    let subject = args.subject.trim();
    anyhow::ensure!(!subject.is_empty(), "subject must not be empty");

    let questions = read_questions(&args.questions)?;
    anyhow::ensure!(!questions.is_empty(), "questions file contains no questions");
    let answers = read_answers(&args.answers)?;
    anyhow::ensure!(
        answers.len() <= questions.len(),
        "answers file has {} entries but the quiz has {} questions",
        answers.len(),
        questions.len()
    );

    let meta = AttemptMeta {
        subject: subject.to_string(),
        topic: args
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| subject.to_string()),
        difficulty: args.difficulty.unwrap_or_default(),
        time_spent_secs: args.time_spent,
    };
    let attempt = grade_attempt(&questions, &answers, meta);

    let store = open_store(args.config.as_deref())?;
    let student = store.current_student()?;
    let student_id = store.current_student_id()?;
    let progress = store.record(&student_id, attempt.clone())?;

    println!("{}", results_table(&attempt));
    println!(
        "Score: {}% ({}), {} of {} correct",
        attempt.score,
        attempt.band(),
        attempt.correct_answers,
        attempt.total_questions
    );
    println!("Attempt id: {}", attempt.id);
    println!(
        "Quizzes taken: {}, average {}%, best {}%",
        progress.total_quizzes, progress.average_score, progress.best_score
    );

    if let Some(path) = &args.export {
        write_attempt_html(&attempt, student.as_ref(), path)?;
        eprintln!("HTML report: {}", path.display());
    }

    Ok(())
}

fn results_table(attempt: &QuizAttempt) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);

    for (i, record) in attempt.answers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&record.question.text),
            Cell::new(record.selected.as_deref().unwrap_or("(skipped)")),
            Cell::new(record.question.answer.as_deref().unwrap_or("-")),
            Cell::new(if record.is_correct { "correct" } else { "wrong" }),
        ]);
    }
    table
}
