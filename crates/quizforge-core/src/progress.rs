//! Per-student progress persisted as JSON files in a data directory.
//!
//! Layout:
//!
//! ```text
//! <dir>/student.json               current login
//! <dir>/progress_<student_id>.json attempts and running totals
//! ```
//!
//! Writes are plain read-modify-write with no locking; two processes
//! recording at once can lose an attempt.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attempt::QuizAttempt;

/// Identity used when nobody is logged in.
pub const GUEST_ID: &str = "guest";

const STUDENT_FILE: &str = "student.json";

/// A logged-in student. There is no authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub joined: DateTime<Utc>,
}

/// Accumulated history for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProgress {
    /// Attempts in completion order.
    pub quizzes: Vec<QuizAttempt>,
    pub total_quizzes: usize,
    /// Running mean of attempt scores, rounded.
    pub average_score: u32,
    pub best_score: u32,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub hours_studied: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl StudentProgress {
    /// Fold one attempt into the running totals.
    pub fn record(&mut self, attempt: QuizAttempt) {
        let previous = self.total_quizzes as u64;
        self.average_score = ((self.average_score as u64 * previous + attempt.score as u64) as f64
            / (previous + 1) as f64)
            .round() as u32;
        self.total_quizzes += 1;
        self.best_score = self.best_score.max(attempt.score);
        self.total_questions += attempt.total_questions;
        self.correct_answers += attempt.correct_answers;
        let seconds: u64 = self
            .quizzes
            .iter()
            .map(|q| q.time_spent_secs)
            .sum::<u64>()
            + attempt.time_spent_secs;
        self.hours_studied = (seconds as f64 / 360.0).round() / 10.0;
        self.last_activity = Some(attempt.completed_at);
        self.quizzes.push(attempt);
    }
}

/// File-backed store for students and their progress.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ids become part of a file name, so only ASCII letters, digits, `-`
    /// and `_` are allowed.
    fn progress_path(&self, student_id: &str) -> Result<PathBuf> {
        let valid = !student_id.is_empty()
            && student_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        anyhow::ensure!(valid, "invalid student id {student_id:?}");
        Ok(self.dir.join(format!("progress_{student_id}.json")))
    }

    /// Load a student's progress; a missing file means no history yet.
    pub fn load(&self, student_id: &str) -> Result<StudentProgress> {
        read_json(&self.progress_path(student_id)?).map(Option::unwrap_or_default)
    }

    /// Append an attempt and persist the updated totals.
    pub fn record(&self, student_id: &str, attempt: QuizAttempt) -> Result<StudentProgress> {
        let mut progress = self.load(student_id)?;
        tracing::debug!(student_id, attempt = %attempt.id, score = attempt.score, "recording attempt");
        progress.record(attempt);
        write_json(&self.progress_path(student_id)?, &progress)?;
        Ok(progress)
    }

    pub fn find_attempt(&self, student_id: &str, id: Uuid) -> Result<Option<QuizAttempt>> {
        Ok(self
            .load(student_id)?
            .quizzes
            .into_iter()
            .find(|q| q.id == id))
    }

    /// Delete all history for a student. Returns whether anything existed.
    pub fn clear(&self, student_id: &str) -> Result<bool> {
        let path = self.progress_path(student_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    /// Log in, creating a fresh student identity.
    pub fn login(&self, name: &str, email: &str) -> Result<Student> {
        let student = Student {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            joined: Utc::now(),
        };
        write_json(&self.dir.join(STUDENT_FILE), &student)?;
        tracing::info!(student_id = %student.id, "logged in");
        Ok(student)
    }

    pub fn current_student(&self) -> Result<Option<Student>> {
        read_json(&self.dir.join(STUDENT_FILE))
    }

    /// Id of the current student, or [`GUEST_ID`].
    pub fn current_student_id(&self) -> Result<String> {
        Ok(self
            .current_student()?
            .map(|s| s.id)
            .unwrap_or_else(|| GUEST_ID.to_string()))
    }

    /// Log out. Progress files are kept.
    pub fn logout(&self) -> Result<bool> {
        let path = self.dir.join(STUDENT_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
