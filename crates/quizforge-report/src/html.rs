//! HTML export for graded attempts and analytics.
//!
//! Produces self-contained HTML files with all CSS inlined, suitable for
//! printing to PDF from a browser.

use anyhow::{Context, Result};
use std::path::Path;

use quizforge_core::analytics::{format_duration, AnalyticsSummary, SubjectPerformance};
use quizforge_core::attempt::{QuizAttempt, ScoreBand};
use quizforge_core::progress::Student;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn open_document(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

fn close_document(html: &mut String) {
    html.push_str("<footer>Generated by quizforge</footer>\n");
    html.push_str("</body>\n</html>");
}

/// Render a graded attempt: score, band, and every question with the
/// student's answer, the correct answer and the explanation.
pub fn generate_attempt_html(attempt: &QuizAttempt, student: Option<&Student>) -> String {
    let mut html = String::new();
    open_document(&mut html, &format!("Quiz results: {}", attempt.topic));

    let band = attempt.band();
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{} &middot; {}</h1>\n",
        html_escape(&attempt.subject),
        html_escape(&attempt.topic)
    ));
    let who = student
        .map(|s| format!("{} | ", html_escape(&s.name)))
        .unwrap_or_default();
    html.push_str(&format!(
        "<p class=\"meta\">{who}{} | {} difficulty | {} | {}</p>\n",
        attempt.completed_at.format("%Y-%m-%d %H:%M UTC"),
        attempt.difficulty,
        format_duration(attempt.time_spent_secs),
        attempt.id,
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"score\">\n");
    html.push_str(&format!(
        "<div class=\"badge {}\">{}%</div>\n<p><strong>{band}</strong>: {} of {} correct</p>\n",
        band.css_class(),
        attempt.score,
        attempt.correct_answers,
        attempt.total_questions,
    ));
    html.push_str("</section>\n");

    html.push_str("<section class=\"questions\">\n<h2>Questions</h2>\n<ol>\n");
    for record in &attempt.answers {
        let q = &record.question;
        let class = if record.is_correct { "pass" } else { "fail" };
        html.push_str(&format!("<li class=\"{class}\">\n"));
        html.push_str(&format!(
            "<p class=\"question\">{} <span class=\"kind\">{}</span></p>\n",
            html_escape(&q.text),
            q.kind
        ));
        if let Some(choices) = &q.choices {
            html.push_str("<ul class=\"choices\">\n");
            for choice in choices {
                let mut marks = Vec::new();
                if q.answer.as_deref() == Some(choice.as_str()) {
                    marks.push("correct");
                }
                if record.selected.as_deref() == Some(choice.as_str()) {
                    marks.push("selected");
                }
                html.push_str(&format!(
                    "<li class=\"{}\">{}</li>\n",
                    marks.join(" "),
                    html_escape(choice)
                ));
            }
            html.push_str("</ul>\n");
        }
        html.push_str(&format!(
            "<p><strong>Your answer:</strong> {}</p>\n",
            record
                .selected
                .as_deref()
                .map(html_escape)
                .unwrap_or_else(|| "<em>skipped</em>".to_string())
        ));
        if let Some(answer) = &q.answer {
            html.push_str(&format!(
                "<p><strong>Correct answer:</strong> {}</p>\n",
                html_escape(answer)
            ));
        }
        if let Some(explanation) = &q.explanation {
            html.push_str(&format!(
                "<p class=\"explanation\">{}</p>\n",
                html_escape(explanation)
            ));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ol>\n</section>\n");

    close_document(&mut html);
    html
}

/// Render overall stats, the per-subject table and a bar chart of subject
/// averages.
pub fn generate_analytics_html(summary: &AnalyticsSummary) -> String {
    let mut html = String::new();
    open_document(&mut html, "quizforge analytics");

    let overall = &summary.overall;
    html.push_str("<header>\n<h1>Learning analytics</h1>\n</header>\n");

    html.push_str("<section class=\"dashboard\">\n<h2>Overview</h2>\n");
    html.push_str("<table class=\"summary\">\n<tbody>\n");
    for (label, value) in [
        ("Quizzes taken", overall.total_quizzes.to_string()),
        ("Average score", format!("{}%", overall.average_score)),
        ("Best score", format!("{}%", overall.best_score)),
        ("Accuracy", format!("{}%", overall.accuracy)),
        (
            "Questions answered",
            format!("{} ({} correct)", overall.total_questions, overall.correct_answers),
        ),
        ("Time spent", format_duration(overall.total_time_secs)),
    ] {
        html.push_str(&format!("<tr><th>{label}</th><td>{value}</td></tr>\n"));
    }
    html.push_str("</tbody></table>\n</section>\n");

    html.push_str("<section class=\"subjects\">\n<h2>By subject</h2>\n");
    if summary.subjects.is_empty() {
        html.push_str("<p class=\"meta\">No quizzes taken yet.</p>\n");
    } else {
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Subject</th><th>Quizzes</th><th>Average</th><th>Best</th><th>Correct</th><th>Trend</th><th>Rating</th></tr></thead>\n<tbody>\n");
        for s in &summary.subjects {
            let band = s.band();
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}%</td><td>{}%</td><td>{}/{}</td><td>{}</td><td class=\"{}\">{band}</td></tr>\n",
                html_escape(&s.subject),
                s.total_quizzes,
                s.average_score,
                s.best_score,
                s.correct_answers,
                s.total_questions,
                s.trend,
                band.css_class(),
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str(&generate_bar_chart(&summary.subjects));
    }
    html.push_str("</section>\n");

    close_document(&mut html);
    html
}

fn band_color(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Excellent => "#22c55e",
        ScoreBand::Good => "#3b82f6",
        ScoreBand::Average => "#eab308",
        ScoreBand::NeedsImprovement => "#ef4444",
    }
}

fn generate_bar_chart(subjects: &[SubjectPerformance]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = subjects.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, subject) in subjects.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = subject.average_score.min(100) as usize * max_width / 100;

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&subject.subject)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width,
            y,
            width,
            bar_height,
            band_color(subject.band())
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            subject.average_score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn write_file(html: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

/// Write an attempt report to a file, creating parent directories.
pub fn write_attempt_html(attempt: &QuizAttempt, student: Option<&Student>, path: &Path) -> Result<()> {
    write_file(&generate_attempt_html(attempt, student), path)
}

/// Write an analytics report to a file, creating parent directories.
pub fn write_analytics_html(summary: &AnalyticsSummary, path: &Path) -> Result<()> {
    write_file(&generate_analytics_html(summary), path)
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
@media print { body { padding: 0; } }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta, footer { color: #6b7280; }
footer { margin-top: 3rem; font-size: 0.8rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.badge { display: inline-block; font-size: 2.5rem; font-weight: bold; padding: 1rem 2rem; border-radius: 12px; color: #fff; }
.excellent { background: #22c55e; } .good { background: #3b82f6; } .average { background: #eab308; } .poor { background: #ef4444; }
td.excellent, td.good, td.average, td.poor { color: #fff; }
.questions > ol > li { margin: 1rem 0; padding: 1rem; border-radius: 8px; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.question { font-weight: bold; }
.kind { font-size: 0.75rem; font-weight: normal; color: #6b7280; margin-left: 0.5rem; }
.choices li.correct { font-weight: bold; }
.choices li.selected { text-decoration: underline; }
.explanation { font-style: italic; }
svg { margin: 1rem 0; }
"#;
