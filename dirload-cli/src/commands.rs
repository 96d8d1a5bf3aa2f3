//! Command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use dirload::{
    default_loaders, load_file, location_from_path, ArrayLoader, LoadOptions, ObjectLoader,
    Value, ValueLoaderExt,
};
use tokio_util::sync::CancellationToken;

use crate::cli::OutputFormat;
use crate::settings::Settings;

/// Load the directory at `dir` and render it.
pub async fn run_load(dir: &Path, settings: &Settings, token: CancellationToken) -> Result<String> {
    let location = location_from_path(dir)?;
    let options = settings.load_options().with_cancellation_token(token);
    tracing::debug!("Loading {} as {}", location, if settings.array { "array" } else { "object" });

    let value = if settings.array {
        ArrayLoader::new(default_loaders())
            .load_directory(location, &options)
            .await
    } else {
        ObjectLoader::new(default_loaders())
            .load_directory(location, &options)
            .await
    }
    .with_context(|| format!("failed to load '{}'", dir.display()))?;

    render(&value, settings)
}

/// Load the single file at `file` and render it.
pub async fn run_file(file: &Path, settings: &Settings, token: CancellationToken) -> Result<String> {
    let location = location_from_path(file)?;
    let options = LoadOptions::new().with_cancellation_token(token);
    let value = load_file(location, &default_loaders(), &options)
        .await
        .with_context(|| format!("failed to load '{}'", file.display()))?;

    render(&value, settings)
}

/// Serialize `value` in the configured output format.
pub fn render(value: &Value, settings: &Settings) -> Result<String> {
    let rendered = match (settings.format, settings.compact) {
        (OutputFormat::Json, false) => serde_json::to_string_pretty(value)?,
        (OutputFormat::Json, true) => serde_json::to_string(value)?,
        (OutputFormat::Yaml, _) => serde_yaml_ng::to_string(value)?,
    };
    Ok(rendered)
}
