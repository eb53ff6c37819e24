//! The `quizforge analytics` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::analytics::{format_duration, summarize, AnalyticsSummary};
use quizforge_report::html::write_analytics_html;

use super::open_store;

const DEFAULT_HTML_OUTPUT: &str = "quizforge-analytics.html";

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Table,
    Json,
    Html,
}

pub fn execute(format: Format, output: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let store = open_store(config.as_deref())?;
    let student_id = store.current_student_id()?;
    let progress = store.load(&student_id)?;
    let summary = summarize(&progress.quizzes);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Html => {
            let path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_HTML_OUTPUT));
            write_analytics_html(&summary, &path)?;
            eprintln!("HTML report: {}", path.display());
        }
        Format::Table => print_tables(&summary),
    }

    Ok(())
}

fn print_tables(summary: &AnalyticsSummary) {
    let overall = &summary.overall;
    if overall.total_quizzes == 0 {
        println!("No quizzes taken yet. Grade one with `quizforge grade`.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Quizzes", "Average", "Best", "Accuracy", "Questions", "Time"]);
    table.add_row(vec![
        Cell::new(overall.total_quizzes),
        Cell::new(format!("{}%", overall.average_score)),
        Cell::new(format!("{}%", overall.best_score)),
        Cell::new(format!("{}%", overall.accuracy)),
        Cell::new(format!("{}/{}", overall.correct_answers, overall.total_questions)),
        Cell::new(format_duration(overall.total_time_secs)),
    ]);
    println!("{table}");

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Quizzes", "Average", "Best", "Trend", "Rating"]);
    for s in &summary.subjects {
        table.add_row(vec![
            Cell::new(&s.subject),
            Cell::new(s.total_quizzes),
            Cell::new(format!("{}%", s.average_score)),
            Cell::new(format!("{}%", s.best_score)),
            Cell::new(s.trend),
            Cell::new(s.band()),
        ]);
    }
    println!("{table}");
}
