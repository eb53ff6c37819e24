//! The `quizforge history` and `quizforge export` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use uuid::Uuid;

use quizforge_report::html::write_attempt_html;

use super::open_store;

pub fn execute(clear: bool, config: Option<PathBuf>) -> Result<()> {
    let store = open_store(config.as_deref())?;
    let student_id = store.current_student_id()?;

    if clear {
        if store.clear(&student_id)? {
            println!("History cleared.");
        } else {
            println!("No history to clear.");
        }
        return Ok(());
    }

    let progress = store.load(&student_id)?;
    if progress.quizzes.is_empty() {
        println!("No quizzes taken yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Completed", "Subject", "Topic", "Score", "Rating"]);
    for quiz in progress.quizzes.iter().rev() {
        table.add_row(vec![
            Cell::new(quiz.id),
            Cell::new(quiz.completed_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&quiz.subject),
            Cell::new(&quiz.topic),
            Cell::new(format!("{}%", quiz.score)),
            Cell::new(quiz.band()),
        ]);
    }
    println!("{table}");
    println!(
        "{} quizzes, average {}%, best {}%, {:.1}h studied",
        progress.total_quizzes, progress.average_score, progress.best_score, progress.hours_studied
    );

    Ok(())
}

/// Write a recorded attempt as HTML.
pub fn export(attempt_id: Uuid, output: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let store = open_store(config.as_deref())?;
    let student = store.current_student()?;
    let student_id = store.current_student_id()?;

    let Some(attempt) = store.find_attempt(&student_id, attempt_id)? else {
        anyhow::bail!("attempt {attempt_id} not found");
    };
    write_attempt_html(&attempt, student.as_ref(), &output)?;
    println!("HTML report: {}", output.display());
    Ok(())
}
