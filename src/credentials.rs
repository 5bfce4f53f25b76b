//! API token file: a small JSON object `{ "token": "..." }`.

use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: String,
}

/// Reads the saved token. Missing, unreadable, malformed or blank files all
/// mean "no token".
pub fn load_api_token(path: &Path) -> Option<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} not found", path.display());
            return None;
        }
        Err(error) => {
            log::error!("Failed to load API token from {}: {}", path.display(), error);
            return None;
        }
    };

    let parsed = match serde_json::from_str::<TokenFile>(&content) {
        Ok(parsed) => parsed,
        Err(error) => {
            log::error!("Failed to parse API token file {}: {}", path.display(), error);
            return None;
        }
    };

    let token = parsed.token.trim();
    if token.is_empty() {
        log::debug!("API token is empty.");
        return None;
    }
    log::debug!("API token loaded successfully.");
    Some(token.to_string())
}

pub fn save_api_token(path: &Path, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(StudioError::validation("API token must not be empty"));
    }

    let payload = serde_json::to_string_pretty(&TokenFile {
        token: token.to_string(),
    })
    .map_err(|error| StudioError::persistence(path, error))?;

    std::fs::write(path, payload).map_err(|error| StudioError::persistence(path, error))?;
    log::debug!("API token saved to {}", path.display());
    Ok(())
}

/// Masks all but the last four characters for display.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{}", "*".repeat(hidden), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_trimmed_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apitoken.json");
        save_api_token(&path, "  pst-abc123  ").expect("save");
        assert_eq!(load_api_token(&path).as_deref(), Some("pst-abc123"));
    }

    #[test]
    fn blank_missing_or_malformed_token_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apitoken.json");
        assert!(load_api_token(&path).is_none());

        std::fs::write(&path, r#"{"token": "   "}"#).expect("write");
        assert!(load_api_token(&path).is_none());

        std::fs::write(&path, r#"{}"#).expect("write");
        assert!(load_api_token(&path).is_none());

        std::fs::write(&path, "garbage").expect("write");
        assert!(load_api_token(&path).is_none());
    }

    #[test]
    fn empty_token_is_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apitoken.json");
        assert!(matches!(
            save_api_token(&path, " "),
            Err(StudioError::ValidationFailure(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask_token("pst-abcdef"), "******cdef");
        assert_eq!(mask_token("abc"), "abc");
    }
}
