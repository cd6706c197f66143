use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{LocatorError, LocatorResult};
use crate::perception::annotator::RenderStyle;
use crate::perception::marker::MarkerParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub marker: MarkerParams,
    #[serde(default)]
    pub render: RenderStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Image-generation model used to paint the location marker.
    #[serde(default = "default_mark_model")]
    pub mark_model: String,
    /// Structured-output model used for element trees (overridable per call).
    #[serde(default = "default_tree_model")]
    pub tree_model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            mark_model: default_mark_model(),
            tree_model: default_tree_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_mark_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_tree_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl VisionConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> LocatorResult<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(LocatorError::MissingCredential(self.api_key_env.clone())),
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }
    None
}

pub fn parse_config(content: &str) -> LocatorResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

/// Load `config.toml`; a missing file yields the built-in defaults.
pub fn load_config() -> LocatorResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::debug!("no config.toml found, using defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), mark_model = %config.vision.mark_model, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.vision.api_key_env, "GEMINI_API_KEY");
        assert_eq!(cfg.vision.tree_model, "gemini-2.0-flash-exp");
        assert_eq!(cfg.marker.hue_min, 130);
        assert_eq!(cfg.marker.close_iterations, 2);
        assert_eq!(cfg.render.border_width, 2);
    }

    #[test]
    fn partial_sections_override_only_given_keys() {
        let cfg = parse_config(
            r#"
            [vision]
            tree_model = "gemini-2.5-flash"

            [marker]
            value_min = 120
            "#,
        )
        .unwrap();
        assert_eq!(cfg.vision.tree_model, "gemini-2.5-flash");
        assert_eq!(cfg.vision.mark_model, "gemini-3-pro-image-preview");
        assert_eq!(cfg.marker.value_min, 120);
        assert_eq!(cfg.marker.saturation_min, 50);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = parse_config("[vision\nmodel=").unwrap_err();
        assert!(matches!(err, LocatorError::TomlDe(_)));
    }

    #[test]
    fn missing_api_key_reports_variable_name() {
        let cfg = VisionConfig {
            api_key_env: "SCREEN_LOCATOR_TEST_UNSET_KEY".into(),
            ..VisionConfig::default()
        };
        let err = cfg.api_key().unwrap_err();
        assert_eq!(err.to_string(), "SCREEN_LOCATOR_TEST_UNSET_KEY environment variable not set");
    }
}
