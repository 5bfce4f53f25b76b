//! Stateless queries over the tag catalog and the prompt corpus.
//!
//! Both operations only read immutable snapshots, so they can be called from
//! any thread.

use crate::catalog::{ArtistSummary, TagCatalog, TagCategory, TagRecord};
use crate::corpus::PromptCorpus;
use crate::error::{Result, StudioError};
use rand::Rng;
use rayon::prelude::*;

/// Selector value that disables a filter.
pub const WILDCARD: &str = "ALL";

/// Number of tag rows a result list shows before truncating.
pub const DEFAULT_TAG_DISPLAY_CAP: usize = 1_000;
/// Number of prompts sampled when a prompt query matches more than this.
pub const DEFAULT_PROMPT_SAMPLE_CAP: usize = 1_000;

/// Filters for a tag search. `None` selectors are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    pub keyword: String,
    pub category: Option<TagCategory>,
    pub d_group: Option<String>,
    pub artist: Option<String>,
    pub min_power: u64,
    pub max_power: u64,
}

impl TagQuery {
    /// Builds a query from selector strings as a UI would present them:
    /// `"ALL"` disables a selector, and the artist selector may carry a
    /// trailing `[power]` annotation.
    pub fn from_selectors(
        keyword: &str,
        category: &str,
        d_group: &str,
        artist: &str,
        min_power: u64,
        max_power: u64,
    ) -> Result<Self> {
        let category = match category.trim() {
            WILDCARD => None,
            name => Some(TagCategory::parse(name).ok_or_else(|| {
                StudioError::validation(format!("unknown category \"{}\"", name))
            })?),
        };

        Ok(Self {
            keyword: keyword.to_string(),
            category,
            d_group: parse_selection(d_group),
            artist: parse_artist_selection(artist),
            min_power,
            max_power,
        })
    }

    fn normalized_keyword(&self) -> String {
        self.keyword.trim().to_lowercase()
    }

    /// Rejects queries that would list the whole catalog or have inverted
    /// power bounds.
    pub fn validate(&self) -> Result<()> {
        if self.normalized_keyword().is_empty() && self.d_group.is_none() && self.artist.is_none()
        {
            return Err(StudioError::validation(
                "enter a keyword or select a d-group or artist to search",
            ));
        }
        if self.min_power > self.max_power {
            return Err(StudioError::validation(format!(
                "min power {} is greater than max power {}",
                self.min_power, self.max_power
            )));
        }
        Ok(())
    }
}

/// A matching tag record with its computed power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch<'a> {
    pub record: &'a TagRecord,
    pub power: u64,
}

/// Runs a tag query. Filters narrow in the order category, d-group, artist,
/// keyword, power. Catalog order is preserved.
pub fn search_tags<'a>(catalog: &'a TagCatalog, query: &TagQuery) -> Result<Vec<TagMatch<'a>>> {
    query.validate()?;
    let keyword = query.normalized_keyword();

    let matches = catalog
        .tags()
        .iter()
        .filter(|tag| query.category.map_or(true, |category| tag.d_category == category))
        .filter(|tag| {
            query
                .d_group
                .as_deref()
                .map_or(true, |group| tag.in_group(group))
        })
        .filter(|tag| {
            query
                .artist
                .as_deref()
                .map_or(true, |artist| tag.tag_name == artist)
        })
        .filter(|tag| keyword.is_empty() || tag.tag_name.to_lowercase().contains(&keyword))
        .filter_map(|tag| {
            let power = tag.power();
            (query.min_power <= power && power <= query.max_power).then_some(TagMatch {
                record: tag,
                power,
            })
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Tag search keyword='{}' category={:?} d_group={:?} artist={:?} power={}..={} matched {}",
        keyword,
        query.category,
        query.d_group,
        query.artist,
        query.min_power,
        query.max_power,
        matches.len()
    );

    Ok(matches)
}

/// Truncates a result list for display, keeping order.
pub fn cap_for_display<T>(results: &[T], cap: usize) -> &[T] {
    &results[..results.len().min(cap)]
}

/// Splits a comma-separated phrase into trimmed, lower-cased, non-empty tokens.
pub fn parse_keywords(phrase: &str) -> Vec<String> {
    phrase
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Finds prompts containing every keyword as a case-insensitive substring.
///
/// An empty phrase matches the whole corpus. When more than `cap` prompts
/// match, a uniform sample of `cap` prompts is drawn from `rng` instead of
/// truncating in corpus order.
pub fn search_prompts<R: Rng + ?Sized>(
    corpus: &PromptCorpus,
    phrase: &str,
    cap: usize,
    rng: &mut R,
) -> Vec<String> {
    let keywords = parse_keywords(phrase);

    let matching: Vec<&String> = if keywords.is_empty() {
        corpus.prompts().iter().collect()
    } else {
        corpus
            .prompts()
            .par_iter()
            .filter(|prompt| {
                let lowered = prompt.to_lowercase();
                keywords.iter().all(|keyword| lowered.contains(keyword.as_str()))
            })
            .collect()
    };

    let total = matching.len();
    let selected: Vec<String> = if total <= cap {
        matching.into_iter().cloned().collect()
    } else {
        rand::seq::index::sample(rng, total, cap)
            .into_iter()
            .map(|index| matching[index].clone())
            .collect()
    };

    log::debug!(
        "Prompt search keywords={:?} selected {} of {} matching prompts",
        keywords,
        selected.len(),
        total
    );
    selected
}

/// Label shown for an artist in a selector, e.g. `"name [1200]"`.
pub fn format_artist_option(artist: &ArtistSummary) -> String {
    format!("{} [{}]", artist.tag_name, artist.power)
}

/// Strips the `[power]` annotation from an artist selector value.
/// Returns `None` for the wildcard.
pub fn parse_artist_selection(value: &str) -> Option<String> {
    let name = value.split('[').next().unwrap_or_default().trim();
    parse_selection(name)
}

fn parse_selection(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == WILDCARD {
        None
    } else {
        Some(value.to_string())
    }
}
