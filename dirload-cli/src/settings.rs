//! Settings layering using Figment.
//!
//! Sources in precedence order: built-in defaults, the `--config` file,
//! `DIRLOAD_`-prefixed environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dirload::{concat_arrays_fn, deep_merge_fn, percent_decode_names, LoadOptions};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::OutputFormat;

/// Prefix of environment variables read as settings.
pub const ENV_PREFIX: &str = "DIRLOAD_";

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub format: OutputFormat,
    pub compact: bool,
    pub strict: bool,
    pub array: bool,
    pub deep_merge: bool,
    pub concat_arrays: bool,
    pub decode_names: bool,
    pub include_symlinks: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_directory_url_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_file_url_as: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            compact: false,
            strict: false,
            array: false,
            deep_merge: false,
            concat_arrays: false,
            decode_names: false,
            include_symlinks: false,
            embed_directory_url_as: None,
            embed_file_url_as: None,
        }
    }
}

impl Settings {
    /// Translate into options for a load.
    pub fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::new()
            .with_strict(self.strict)
            .with_include_symlinks(self.include_symlinks);
        if self.deep_merge {
            options.object_merge = Some(deep_merge_fn());
        }
        if self.concat_arrays {
            options.array_merge = Some(concat_arrays_fn());
        }
        if self.decode_names {
            options.property_name_decoder = Some(percent_decode_names());
        }
        options.embed_directory_url_as = self.embed_directory_url_as.clone();
        options.embed_file_url_as = self.embed_file_url_as.clone();
        options
    }
}

/// Settings given on the command line. Only flags that were set override
/// the other sources.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat_arrays: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_names: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_directory_url_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_file_url_as: Option<String>,
}

/// A flag that is off means "not given", not "force off".
pub fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

/// Builds [`Settings`] from every source.
#[derive(Debug, Clone, Default)]
pub struct SettingsProvider {
    config_file: Option<PathBuf>,
}

impl SettingsProvider {
    pub fn new(config_file: Option<PathBuf>) -> Self {
        Self { config_file }
    }

    /// Resolve the effective settings with `overrides` on top.
    pub fn load(&self, overrides: &Overrides) -> Result<Settings> {
        let settings = self
            .build_figment(overrides)?
            .extract::<Settings>()
            .context("invalid settings")?;
        debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    fn build_figment(&self, overrides: &Overrides) -> Result<Figment> {
        debug!("Building settings with precedence order");
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = &self.config_file {
            figment = figment.merge(Self::load_config_file(path)?);
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
            .merge(Serialized::defaults(overrides)))
    }

    fn load_config_file(path: &Path) -> Result<Figment> {
        if !path.is_file() {
            bail!("settings file '{}' not found", path.display());
        }
        debug!("Loading settings file: {}", path.display());
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Figment::from(Toml::file(path))),
            Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
            Some("json") => Ok(Figment::from(Json::file(path))),
            _ => bail!(
                "settings file '{}' must end in .toml, .yaml, .yml or .json",
                path.display()
            ),
        }
    }
}
