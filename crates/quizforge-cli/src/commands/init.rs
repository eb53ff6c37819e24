//! The `quizforge init` command.

use anyhow::{Context, Result};

const CONFIG_FILE: &str = "quizforge.toml";

pub fn execute() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);
    if path.exists() {
        println!("{CONFIG_FILE} already exists, skipping.");
        return Ok(());
    }
    std::fs::write(path, SAMPLE_CONFIG).with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE}");

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY, OPENAI_API_KEY or CLAUDE_API_KEY (a .env file works too)");
    println!("  2. Run: quizforge generate --topic \"Photosynthesis\" --count 10 --output quiz.json");
    println!("  3. Answer the quiz, then run: quizforge grade --questions quiz.json --answers answers.json --subject Biology");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

default_provider = "gemini"
# data_dir = "/path/to/progress"

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
model = "gemini-2.5-flash"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"
model = "gpt-4o-mini"

[providers.claude]
type = "anthropic"
api_key = "${CLAUDE_API_KEY}"
model = "claude-sonnet-4-20250514"

[generation]
batch_threshold = 20
batch_size = 20
similarity_threshold = 0.78
extra_batches = 2
max_rate_limit_wait_ms = 10000
max_tokens = 4096
temperature = 0.7
validation_policy = "repair"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config = quizforge_providers::config::parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.generation.batch_size, 20);
        let (name, _) = config.provider("claude").unwrap();
        assert_eq!(name, "anthropic");
    }
}
