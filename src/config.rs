use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Settings read from the environment and an optional JSON file.
///
/// File keys are camelCase (`maxUploadBytes`, `allowedFileTypes`,
/// `maxJsonBytes`, `allowUnknownFields`). Environment variables win over the
/// file. Unset sizes fall back to the `Tools` defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolsConfig {
    pub max_upload_bytes: Option<u64>,
    pub allowed_file_types: Vec<String>,
    pub max_json_bytes: Option<usize>,
    pub allow_unknown_fields: bool,
}

impl ToolsConfig {
    /// Reads the following variables:
    ///
    /// * `WEBTOOLKIT_CONFIG` (optional) – path to a JSON configuration file.
    /// * `WEBTOOLKIT_MAX_UPLOAD_BYTES` – aggregate multipart body ceiling.
    /// * `WEBTOOLKIT_ALLOWED_FILE_TYPES` – comma separated MIME types.
    /// * `WEBTOOLKIT_MAX_JSON_BYTES` – JSON body ceiling.
    /// * `WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS` – accept keys the target type lacks.
    pub fn from_env() -> Result<Self> {
        let mut config = if let Ok(path) = env::var("WEBTOOLKIT_CONFIG") {
            let content = fs::read_to_string(&path).with_context(|| {
                format!("Failed to read WEBTOOLKIT_CONFIG '{}': file unreadable", path)
            })?;
            serde_json::from_str::<ToolsConfig>(&content).with_context(|| {
                format!(
                    "Failed to parse WEBTOOLKIT_CONFIG '{}': invalid JSON configuration",
                    path
                )
            })?
        } else {
            ToolsConfig::default()
        };

        if let Some(max) = parse_optional_u64("WEBTOOLKIT_MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = Some(max);
        }
        if let Some(max) = parse_optional_usize("WEBTOOLKIT_MAX_JSON_BYTES")? {
            config.max_json_bytes = Some(max);
        }
        if let Ok(raw) = env::var("WEBTOOLKIT_ALLOWED_FILE_TYPES") {
            config.allowed_file_types = raw
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }
        if let Some(allow) = parse_bool_env("WEBTOOLKIT_ALLOW_UNKNOWN_FIELDS")? {
            config.allow_unknown_fields = allow;
        }

        config.max_upload_bytes = config.max_upload_bytes.filter(|n| *n > 0);
        config.max_json_bytes = config.max_json_bytes.filter(|n| *n > 0);
        Ok(config)
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_optional_usize(var: &str) -> Result<Option<usize>> {
    parse_optional_u64(var)?
        .map(|value| {
            usize::try_from(value)
                .map_err(|_| anyhow!("{} is too large for this platform ({})", var, value))
        })
        .transpose()
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
