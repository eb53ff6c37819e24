pub mod analytics;
pub mod analyze_image;
pub mod generate;
pub mod grade;
pub mod history;
pub mod init;
pub mod list_models;
pub mod session;

use std::path::Path;

use anyhow::Result;

use quizforge_core::progress::ProgressStore;
use quizforge_providers::load_config_from;

/// Open the progress store in the configured data directory.
pub(crate) fn open_store(config_path: Option<&Path>) -> Result<ProgressStore> {
    let config = load_config_from(config_path)?;
    Ok(ProgressStore::new(config.data_dir()))
}
