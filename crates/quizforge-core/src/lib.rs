//! quizforge-core: question model, generation pipeline, grading and progress.
//!
//! This crate holds everything that does not talk to the network: prompt
//! construction, response parsing, deduplication, fallback synthesis, the
//! batching orchestrator, and the student-side bookkeeping built on top of
//! generated quizzes.

pub mod analytics;
pub mod attempt;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod model;
pub mod parser;
pub mod progress;
pub mod prompt;
pub mod traits;
