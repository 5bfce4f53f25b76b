// ────────────────────────── Tag catalog ──────────────────────────

use crate::catalog::load_tag_catalog;
use crate::config::StudioConfig;
use crate::search::{self, TagQuery};
use anyhow::Result;
use colored::Colorize;

/// Selector values for a tag search, as typed on the command line.
#[derive(Debug, Clone)]
pub struct TagSearchArgs {
    pub keyword: String,
    pub category: String,
    pub d_group: String,
    pub artist: String,
    pub min_power: u64,
    pub max_power: u64,
}

pub fn search_tag_catalog(config: &StudioConfig, args: &TagSearchArgs) -> Result<()> {
    let query = TagQuery::from_selectors(
        &args.keyword,
        &args.category,
        &args.d_group,
        &args.artist,
        args.min_power,
        args.max_power,
    )?;
    // Validate before paying for the dataset load.
    query.validate()?;

    let catalog = load_tag_catalog(&config.tags_path);
    let results = search::search_tags(&catalog, &query)?;
    if results.is_empty() {
        println!("No matching tags found.");
        return Ok(());
    }

    let shown = search::cap_for_display(&results, config.tag_display_cap);
    for (index, found) in shown.iter().enumerate() {
        let category = found.record.d_category;
        let (r, g, b) = category.color();
        println!(
            "{:>4}. {} - Power: {} ({})",
            index + 1,
            found.record.tag_name.truecolor(r, g, b),
            found.power,
            category.as_str()
        );
    }
    log::debug!(
        "Displayed {} results out of {} total matching tags.",
        shown.len(),
        results.len()
    );
    if shown.len() < results.len() {
        println!("… {} more not shown", results.len() - shown.len());
    }
    Ok(())
}

pub fn list_artists(config: &StudioConfig, limit: Option<usize>) -> Result<()> {
    let catalog = load_tag_catalog(&config.tags_path);
    let artists = catalog.artists();
    let shown = search::cap_for_display(artists, limit.unwrap_or(artists.len()));

    println!("{}", search::WILDCARD);
    for artist in shown {
        println!("{}", search::format_artist_option(artist));
    }
    Ok(())
}

pub fn list_d_groups(config: &StudioConfig) -> Result<()> {
    let catalog = load_tag_catalog(&config.tags_path);
    println!("{}", search::WILDCARD);
    for group in catalog.d_groups() {
        println!("{}", group);
    }
    Ok(())
}
