//! Tag catalog: the parsed tag dataset plus the views derived from it.
//!
//! The dataset is an object with a `tags` array. Records are immutable after
//! load; `power` is never stored and is recomputed from the two counters
//! whenever it is needed.

use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    General,
    Artist,
    Copyright,
    Character,
    Meta,
    #[default]
    #[serde(other)]
    None,
}

impl TagCategory {
    pub const ALL: [TagCategory; 6] = [
        TagCategory::General,
        TagCategory::Artist,
        TagCategory::Copyright,
        TagCategory::Character,
        TagCategory::Meta,
        TagCategory::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Artist => "artist",
            Self::Copyright => "copyright",
            Self::Character => "character",
            Self::Meta => "meta",
            Self::None => "none",
        }
    }

    /// Display color (RGB) used when rendering result rows.
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            Self::General => (0x00, 0xcc, 0x66),
            Self::Artist => (0xff, 0xcc, 0x00),
            Self::Copyright => (0x33, 0xcc, 0xff),
            Self::Character => (0xff, 0x66, 0x99),
            Self::Meta => (0x99, 0xcc, 0x00),
            Self::None => (0x80, 0x80, 0x80),
        }
    }

    /// Parses an exact lower-case category name. Unknown names yield `None`
    /// (the Rust option, not the category).
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRecord {
    pub tag_name: String,
    #[serde(default)]
    pub d_category: TagCategory,
    #[serde(default)]
    pub d_count: u64,
    #[serde(default)]
    pub n_count: u64,
    #[serde(default)]
    pub d_group: Vec<String>,
}

impl TagRecord {
    /// Larger of the two provenance counters.
    pub fn power(&self) -> u64 {
        self.d_count.max(self.n_count)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.d_group.iter().any(|value| value == group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtistSummary {
    pub tag_name: String,
    pub power: u64,
}

#[derive(Debug, Deserialize)]
struct TagDataset {
    #[serde(default)]
    tags: Vec<TagRecord>,
}

/// In-memory tag dataset with its derived artist list and d-group set.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    tags: Vec<TagRecord>,
    artists: Vec<ArtistSummary>,
    d_groups: Vec<String>,
}

impl TagCatalog {
    pub fn new(tags: Vec<TagRecord>) -> Self {
        let artists = extract_artists(&tags);
        let d_groups = extract_d_groups(&tags);
        Self {
            tags,
            artists,
            d_groups,
        }
    }

    pub fn from_json_str(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let dataset: TagDataset = serde_json::from_str(raw)?;
        Ok(Self::new(dataset.tags))
    }

    pub fn tags(&self) -> &[TagRecord] {
        &self.tags
    }

    /// Artists sorted by descending power, then ascending name.
    pub fn artists(&self) -> &[ArtistSummary] {
        &self.artists
    }

    /// Every d-group label, deduplicated and sorted.
    pub fn d_groups(&self) -> &[String] {
        &self.d_groups
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Loads the tag dataset, degrading to an empty catalog on any failure.
pub fn load_tag_catalog(path: &Path) -> TagCatalog {
    match load_tag_catalog_strict(path) {
        Ok(catalog) => {
            log::debug!(
                "Loaded {} tags ({} artists, {} d-groups) from {}",
                catalog.len(),
                catalog.artists.len(),
                catalog.d_groups.len(),
                path.display()
            );
            catalog
        }
        Err(error) => {
            log::error!("Failed to load tag dataset: {}", error);
            TagCatalog::default()
        }
    }
}

pub fn load_tag_catalog_strict(path: &Path) -> Result<TagCatalog> {
    let content =
        std::fs::read_to_string(path).map_err(|error| StudioError::persistence(path, error))?;
    TagCatalog::from_json_str(&content).map_err(|error| StudioError::persistence(path, error))
}

fn extract_artists(tags: &[TagRecord]) -> Vec<ArtistSummary> {
    let mut seen = HashSet::new();
    let mut artists: Vec<ArtistSummary> = tags
        .iter()
        .filter(|tag| tag.d_category == TagCategory::Artist)
        .map(|tag| ArtistSummary {
            tag_name: tag.tag_name.clone(),
            power: tag.power(),
        })
        .filter(|artist| seen.insert(artist.clone()))
        .collect();

    artists.sort_by(|a, b| {
        b.power
            .cmp(&a.power)
            .then_with(|| a.tag_name.cmp(&b.tag_name))
    });
    artists
}

fn extract_d_groups(tags: &[TagRecord]) -> Vec<String> {
    tags.iter()
        .flat_map(|tag| tag.d_group.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
