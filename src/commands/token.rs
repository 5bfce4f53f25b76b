// ────────────────────────── API token ──────────────────────────

use crate::config::StudioConfig;
use crate::credentials::{load_api_token, mask_token, save_api_token};
use anyhow::{Context, Result};

pub fn set_token(config: &StudioConfig, token: &str) -> Result<()> {
    save_api_token(&config.token_path, token)?;
    println!("API token saved to {}", config.token_path.display());
    Ok(())
}

pub fn show_token(config: &StudioConfig) -> Result<()> {
    match load_api_token(&config.token_path) {
        Some(token) => println!("API token: {}", mask_token(&token)),
        None => println!("No API token configured."),
    }
    Ok(())
}

pub fn clear_token(config: &StudioConfig) -> Result<()> {
    if config.token_path.exists() {
        std::fs::remove_file(&config.token_path).with_context(|| {
            format!("failed to remove {}", config.token_path.display())
        })?;
    }
    println!("API token cleared.");
    Ok(())
}
