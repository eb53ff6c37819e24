//! quizforge-providers: text-generation backends.
//!
//! Implements the `TextProvider` trait for Gemini, OpenAI and Anthropic, plus
//! a scriptable mock, and loads provider configuration from TOML and the
//! environment.

pub mod anthropic;
pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{
    canonical_provider_name, create_provider, load_config, load_config_from, QuizforgeConfig,
    ProviderConfig,
};
pub use quizforge_core::error::ProviderError;
