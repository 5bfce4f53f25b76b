// ────────────────────────── Generation ──────────────────────────

use crate::config::StudioConfig;
use crate::credentials::load_api_token;
use crate::error::StudioError;
use crate::nai_api::NaiClient;
use crate::registry::ImageRegistry;
use crate::worker::{GenerationEvent, GenerationWorker};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn show_image(config: &StudioConfig, prompt: &str) -> Result<()> {
    let registry = ImageRegistry::open(&config.registry_path);
    match registry.lookup(prompt) {
        Some(path) => println!("{}", path.display()),
        None => println!("No image found for this prompt."),
    }
    Ok(())
}

pub fn gallery(config: &StudioConfig) -> Result<()> {
    let registry = ImageRegistry::open(&config.registry_path);
    let entries = registry.gallery();
    if entries.is_empty() {
        println!("Gallery is empty.");
        return Ok(());
    }
    for entry in entries {
        println!("{}\n    {}", entry.image_path.display(), entry.prompt);
    }
    Ok(())
}

/// Generates an image for each prompt that has none yet, one request at a
/// time. With `force`, cached prompts are generated again.
pub fn generate_images(config: &StudioConfig, prompts: &[String], force: bool) -> Result<()> {
    let mut registry = ImageRegistry::open(&config.registry_path);

    let pending: Vec<&String> = prompts
        .iter()
        .filter(|prompt| match registry.lookup(prompt) {
            Some(path) if !force => {
                println!("Image exists for prompt: {}\n    {}", prompt, path.display());
                false
            }
            _ => true,
        })
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let client = NaiClient::new(
        config.endpoint.clone(),
        load_api_token(&config.token_path),
        config.request_timeout_seconds,
    );
    if !client.has_token() {
        return Err(StudioError::MissingCredential.into());
    }

    let mut worker = GenerationWorker::new(Arc::new(client), config.output_dir.clone());
    let mut failures = 0usize;
    for prompt in pending {
        worker.submit(prompt)?;
        match wait_for_completion(&mut worker, &mut registry) {
            Ok(path) => log::info!("Image generated and saved to {}", path.display()),
            Err(error) => {
                failures += 1;
                log::error!("Generation failed: {}", error);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} generation request(s) failed", failures);
    }
    Ok(())
}

fn wait_for_completion(
    worker: &mut GenerationWorker,
    registry: &mut ImageRegistry,
) -> std::result::Result<PathBuf, StudioError> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    loop {
        let Some(event) = worker.next_event_timeout(POLL_INTERVAL) else {
            continue;
        };

        match worker.apply(event, registry) {
            GenerationEvent::Sending { prompt } => {
                spinner.set_message(format!("Generating image for: {}", prompt));
            }
            GenerationEvent::Succeeded { image_path, .. } => {
                spinner.finish_with_message(format!("Saved {}", image_path.display()));
                return Ok(image_path);
            }
            GenerationEvent::Failed { error, .. } => {
                spinner.abandon_with_message(format!("Failed: {}", error));
                return Err(error);
            }
        }
    }
}
