// ────────────────────────── Prompt corpus ──────────────────────────

use crate::composer::append_tag;
use crate::config::StudioConfig;
use crate::corpus::PromptCorpus;
use crate::registry::ImageRegistry;
use crate::search;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn search_prompt_corpus(config: &StudioConfig, phrase: &str, seed: Option<u64>) -> Result<()> {
    let corpus = PromptCorpus::load(&config.prompts_path);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let selected = search::search_prompts(&corpus, phrase, config.prompt_sample_cap, &mut rng);
    if selected.is_empty() {
        println!("No matching prompts found.");
        return Ok(());
    }

    let registry = ImageRegistry::open(&config.registry_path);
    for prompt in &selected {
        let marker = if registry.lookup(prompt).is_some() {
            "[img]"
        } else {
            "     "
        };
        println!("{} {}", marker, prompt);
    }
    Ok(())
}

pub fn compose_prompt(current: &str, tags: &[String]) -> Result<()> {
    let composed = tags
        .iter()
        .fold(current.to_string(), |prompt, tag| append_tag(&prompt, tag));
    println!("{}", composed);
    Ok(())
}
