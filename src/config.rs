use crate::error::{Result, StudioError};
use crate::nai_api::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECONDS};
use crate::search::{DEFAULT_PROMPT_SAMPLE_CAP, DEFAULT_TAG_DISPLAY_CAP};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "studio_config.json";
const OUTPUT_DIR_ENV: &str = "NAI_STUDIO_OUTPUT_DIR";

/// File locations and limits. Every field falls back to its default when
/// absent from the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudioConfig {
    pub tags_path: PathBuf,
    pub prompts_path: PathBuf,
    pub registry_path: PathBuf,
    pub token_path: PathBuf,
    pub output_dir: PathBuf,
    pub prompt_sample_cap: usize,
    pub tag_display_cap: usize,
    pub endpoint: String,
    pub request_timeout_seconds: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            tags_path: PathBuf::from("naidv3_tags_pretty.json"),
            prompts_path: PathBuf::from("safebooru_clean.json"),
            registry_path: PathBuf::from("generated_images.json"),
            token_path: PathBuf::from("apitoken.json"),
            output_dir: PathBuf::from("images"),
            prompt_sample_cap: DEFAULT_PROMPT_SAMPLE_CAP,
            tag_display_cap: DEFAULT_TAG_DISPLAY_CAP,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl StudioConfig {
    /// Reads the config file, falling back to defaults when it is missing or
    /// malformed, then applies environment overrides.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<StudioConfig>(&content).unwrap_or_else(|error| {
                log::warn!(
                    "Ignoring malformed config {}: {}; using defaults",
                    path.display(),
                    error
                );
                StudioConfig::default()
            }),
            Err(_) => StudioConfig::default(),
        };

        if let Some(output_dir) = std::env::var_os(OUTPUT_DIR_ENV) {
            if !output_dir.is_empty() {
                config.output_dir = PathBuf::from(output_dir);
            }
        }
        config
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)
            .map_err(|error| StudioError::persistence(path, error))?;
        std::fs::write(path, payload).map_err(|error| StudioError::persistence(path, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"prompt_sample_cap": 25, "tags_path": "tags.json"}"#)
            .expect("write");

        let config = StudioConfig::load(&path);
        assert_eq!(config.prompt_sample_cap, 25);
        assert_eq!(config.tags_path, PathBuf::from("tags.json"));
        assert_eq!(config.registry_path, PathBuf::from("generated_images.json"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{{{").expect("write");
        let config = StudioConfig::load(&path);
        assert_eq!(config.tag_display_cap, DEFAULT_TAG_DISPLAY_CAP);
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let config = StudioConfig {
            prompt_sample_cap: 10,
            ..StudioConfig::default()
        };
        config.save(&path).expect("save");
        let raw = std::fs::read_to_string(&path).expect("read");
        let parsed: StudioConfig = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, config);
    }
}
