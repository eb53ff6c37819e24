//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizforge_core::engine::GeneratorConfig;
use quizforge_core::traits::TextProvider;

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;

/// Names accepted for the provider selection, with their canonical form.
const PROVIDER_ALIASES: [(&str, &str); 4] = [
    ("gemini", "gemini"),
    ("openai", "openai"),
    ("anthropic", "anthropic"),
    ("claude", "anthropic"),
];

/// Configuration for a single backend.
///
/// Keys are optional: an unconfigured backend still constructs, and its
/// first call fails with a missing-credential error. `Debug` masks keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    OpenAI {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    #[serde(alias = "claude")]
    Anthropic {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

fn mask(key: &Option<String>) -> &'static str {
    match key {
        Some(k) if !k.is_empty() => "***",
        _ => "<unset>",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key,
                base_url,
                model,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &mask(api_key))
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                org_id,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &mask(api_key))
                .field("base_url", base_url)
                .field("org_id", org_id)
                .field("model", model)
                .finish(),
            ProviderConfig::Anthropic {
                api_key,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &mask(api_key))
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// An unconfigured entry for a canonical provider name.
    pub fn empty(canonical: &str) -> Option<Self> {
        match canonical {
            "gemini" => Some(ProviderConfig::Gemini {
                api_key: None,
                base_url: None,
                model: None,
            }),
            "openai" => Some(ProviderConfig::OpenAI {
                api_key: None,
                base_url: None,
                org_id: None,
                model: None,
            }),
            "anthropic" => Some(ProviderConfig::Anthropic {
                api_key: None,
                base_url: None,
                model: None,
            }),
            _ => None,
        }
    }

    /// Configured model, or the backend's default.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Gemini { model, .. } => model.as_deref().unwrap_or("gemini-2.5-flash"),
            ProviderConfig::OpenAI { model, .. } => model.as_deref().unwrap_or("gpt-4o-mini"),
            ProviderConfig::Anthropic { model, .. } => {
                model.as_deref().unwrap_or("claude-sonnet-4-20250514")
            }
        }
    }

    pub fn has_api_key(&self) -> bool {
        let key = match self {
            ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. } => api_key,
        };
        key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    fn api_key_mut(&mut self) -> &mut Option<String> {
        match self {
            ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. } => api_key,
        }
    }

    fn model_mut(&mut self) -> &mut Option<String> {
        match self {
            ProviderConfig::Gemini { model, .. }
            | ProviderConfig::OpenAI { model, .. }
            | ProviderConfig::Anthropic { model, .. } => model,
        }
    }
}

/// Top-level quizforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// Provider used when none is given on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Directory for progress and login files.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Generation tuning; the model comes from the provider entry.
    #[serde(default)]
    pub generation: GeneratorConfig,
}

fn default_provider() -> String {
    "gemini".to_string()
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            data_dir: None,
            providers: HashMap::new(),
            generation: GeneratorConfig::default(),
        }
    }
}

impl QuizforgeConfig {
    /// Directory for persisted student data.
    ///
    /// Uses `data_dir` if set, otherwise `~/.quizforge`, otherwise
    /// `./.quizforge`.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".quizforge"))
            .unwrap_or_else(|_| PathBuf::from(".quizforge"))
    }

    /// Look up a provider by name or alias, falling back to an unconfigured
    /// entry for known backends.
    pub fn provider(&self, name: &str) -> Result<(String, ProviderConfig)> {
        let canonical = canonical_provider_name(name)?;
        if let Some(config) = self.providers.get(canonical) {
            return Ok((canonical.to_string(), config.clone()));
        }
        if let Some(config) = self.providers.get(name) {
            return Ok((canonical.to_string(), config.clone()));
        }
        let config = ProviderConfig::empty(canonical)
            .with_context(|| format!("unknown provider '{name}'"))?;
        Ok((canonical.to_string(), config))
    }

    /// Generator settings for a provider, with its model filled in.
    pub fn generator_config(&self, provider: &ProviderConfig, model: Option<&str>) -> GeneratorConfig {
        GeneratorConfig {
            model: model.unwrap_or_else(|| provider.model()).to_string(),
            ..self.generation.clone()
        }
    }
}

/// Map a provider name or alias (case-insensitive) to its canonical name.
pub fn canonical_provider_name(name: &str) -> Result<&'static str> {
    let lowered = name.trim().to_lowercase();
    PROVIDER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
        .with_context(|| {
            format!("unknown provider '{name}' (expected gemini, openai, anthropic or claude)")
        })
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = lookup(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_opt(value: &mut Option<String>, lookup: &dyn Fn(&str) -> Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = resolve_env_vars(v, lookup);
    }
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

fn resolve_provider_config(config: &mut ProviderConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    match config {
        ProviderConfig::Gemini {
            api_key,
            base_url,
            model,
        }
        | ProviderConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => {
            resolve_opt(api_key, lookup);
            resolve_opt(base_url, lookup);
            resolve_opt(model, lookup);
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            model,
        } => {
            resolve_opt(api_key, lookup);
            resolve_opt(base_url, lookup);
            resolve_opt(org_id, lookup);
            resolve_opt(model, lookup);
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations, then
/// apply environment overrides.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("quizforge.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizforgeConfig::default(),
    };

    apply_env(&mut config, &|name| std::env::var(name).ok());
    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config(content: &str) -> Result<QuizforgeConfig> {
    Ok(toml::from_str::<QuizforgeConfig>(content)?)
}

/// Apply `${VAR}` interpolation and the environment overrides.
///
/// Overrides: `QUIZFORGE_PROVIDER`, `QUIZFORGE_DATA_DIR`, `GEMINI_API_KEY`,
/// `GEMINI_MODEL`, `OPENAI_API_KEY`, `OPENAI_MODEL`, `CLAUDE_API_KEY` (or
/// `ANTHROPIC_API_KEY`), `CLAUDE_MODEL`.
pub fn apply_env(config: &mut QuizforgeConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    for provider in config.providers.values_mut() {
        resolve_provider_config(provider, lookup);
    }

    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(provider) = non_empty("QUIZFORGE_PROVIDER") {
        config.default_provider = provider;
    }
    if let Some(dir) = non_empty("QUIZFORGE_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
    }

    let overrides = [
        ("gemini", non_empty("GEMINI_API_KEY"), non_empty("GEMINI_MODEL")),
        ("openai", non_empty("OPENAI_API_KEY"), non_empty("OPENAI_MODEL")),
        (
            "anthropic",
            non_empty("CLAUDE_API_KEY").or_else(|| non_empty("ANTHROPIC_API_KEY")),
            non_empty("CLAUDE_MODEL"),
        ),
    ];

    for (name, key, model) in overrides {
        if key.is_none() && model.is_none() {
            continue;
        }
        let Some(empty) = ProviderConfig::empty(name) else {
            continue;
        };
        let entry = config.providers.entry(name.to_string()).or_insert(empty);
        if let Some(key) = key {
            *entry.api_key_mut() = Some(key);
        }
        if let Some(model) = model {
            *entry.model_mut() = Some(model);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn TextProvider> {
    match config {
        ProviderConfig::Gemini {
            api_key, base_url, ..
        } => Arc::new(GeminiProvider::new(api_key.clone(), base_url.clone())),
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            ..
        } => Arc::new(OpenAiProvider::new(
            api_key.clone(),
            base_url.clone(),
            org_id.clone(),
        )),
        ProviderConfig::Anthropic {
            api_key, base_url, ..
        } => Arc::new(AnthropicProvider::new(api_key.clone(), base_url.clone())),
    }
}
