//! The `quizforge analyze-image` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use quizforge_core::traits::ImageRequest;
use quizforge_providers::{create_provider, load_config_from};

/// Build a `data:` URI for an image file, picking the MIME type from the
/// file extension.
fn image_data_uri(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => anyhow::bail!(
            "unsupported image type '{}' (expected png, jpeg, gif or webp)",
            path.display()
        ),
    };
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    anyhow::ensure!(!bytes.is_empty(), "image file {} is empty", path.display());
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

pub async fn execute(
    image: PathBuf,
    prompt: String,
    provider: Option<String>,
    model: Option<String>,
    max_tokens: u32,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let image_data_uri = image_data_uri(&image)?;

    let provider_name = provider.as_deref().unwrap_or(&config.default_provider);
    let (provider_name, provider_config) = config.provider(provider_name)?;
    let model = model.unwrap_or_else(|| provider_config.model().to_string());
    let provider = create_provider(&provider_config);

    let response = provider
        .analyze_image(&ImageRequest {
            model,
            prompt,
            image_data_uri,
            max_tokens,
        })
        .await
        .with_context(|| format!("image analysis via {provider_name} failed"))?;

    println!("{}", response.content.trim());
    eprintln!(
        "{} ({} tokens, {}ms)",
        response.model, response.token_usage.total_tokens, response.latency_ms
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let uri = image_data_uri(&path).unwrap();
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        quizforge_core::traits::parse_data_uri(&uri).unwrap();
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(image_data_uri(&path).is_err());
    }
}
