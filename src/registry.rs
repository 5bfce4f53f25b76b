//! Persisted prompt → generated image mapping.
//!
//! The whole table is rewritten on every change through a temp file in the
//! same directory followed by a rename, so a torn write never leaves a
//! half-written registry behind.

use crate::error::{Result, StudioError};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ImageRegistry {
    path: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

/// A registry entry whose image is still on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub prompt: String,
    pub image_path: PathBuf,
}

impl ImageRegistry {
    /// Loads the registry at `path`. A missing or malformed file yields an
    /// empty registry bound to the same path.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored image path for `prompt`, if the file still exists.
    pub fn lookup(&self, prompt: &str) -> Option<&Path> {
        let image_path = self.entries.get(prompt)?;
        if image_path.is_file() {
            Some(image_path.as_path())
        } else {
            log::debug!(
                "Registry entry for prompt '{}' points at missing file {}",
                prompt,
                image_path.display()
            );
            None
        }
    }

    /// Inserts or replaces the mapping and persists the whole table.
    pub fn record(&mut self, prompt: &str, image_path: &Path) -> Result<()> {
        if !image_path.is_file() {
            return Err(StudioError::persistence(
                image_path,
                "generated image does not exist",
            ));
        }

        let previous = self
            .entries
            .insert(prompt.to_string(), image_path.to_path_buf());
        if let Err(error) = self.persist() {
            match previous {
                Some(previous) => self.entries.insert(prompt.to_string(), previous),
                None => self.entries.remove(prompt),
            };
            return Err(error);
        }
        Ok(())
    }

    /// Entries whose image file exists, ordered by prompt.
    pub fn gallery(&self) -> Vec<GalleryEntry> {
        self.entries
            .iter()
            .filter(|(_, image_path)| image_path.is_file())
            .map(|(prompt, image_path)| GalleryEntry {
                prompt: prompt.clone(),
                image_path: image_path.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|error| StudioError::persistence(&dir, error))?;

        let payload = serde_json::to_string_pretty(&self.entries)
            .map_err(|error| StudioError::persistence(&self.path, error))?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|error| StudioError::persistence(&dir, error))?;
        temp.write_all(payload.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|error| StudioError::persistence(temp.path(), error))?;
        temp.persist(&self.path)
            .map_err(|error| StudioError::persistence(&self.path, error.error))?;

        log::debug!(
            "Saved {} registry entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, PathBuf> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(error) => {
            log::error!("Failed to load {}: {}", path.display(), error);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<BTreeMap<String, PathBuf>>(&content) {
        Ok(entries) => {
            log::debug!("Loaded {} registry entries from {}", entries.len(), path.display());
            entries
        }
        Err(error) => {
            log::error!("Failed to parse {}: {}", path.display(), error);
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_lookup_returns_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("image_0.png");
        std::fs::write(&image, b"png").expect("write");

        let mut registry = ImageRegistry::open(dir.path().join("generated_images.json"));
        registry.record("1girl, smile", &image).expect("record");
        assert_eq!(registry.lookup("1girl, smile"), Some(image.as_path()));
        assert_eq!(registry.lookup("1girl,smile"), None);
    }

    #[test]
    fn deleted_image_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("image_0.png");
        std::fs::write(&image, b"png").expect("write");

        let mut registry = ImageRegistry::open(dir.path().join("generated_images.json"));
        registry.record("cat", &image).expect("record");
        std::fs::remove_file(&image).expect("remove");

        assert_eq!(registry.lookup("cat"), None);
        assert!(registry.gallery().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry_path = dir.path().join("generated_images.json");
        let first = dir.path().join("image_0.png");
        let second = dir.path().join("image_1.png");
        std::fs::write(&first, b"png").expect("write");
        std::fs::write(&second, b"png").expect("write");

        let mut registry = ImageRegistry::open(&registry_path);
        registry.record("b prompt", &first).expect("record");
        registry.record("a prompt", &second).expect("record");
        registry.record("b prompt", &second).expect("overwrite");

        let reopened = ImageRegistry::open(&registry_path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup("b prompt"), Some(second.as_path()));
        let prompts: Vec<String> = reopened.gallery().into_iter().map(|e| e.prompt).collect();
        assert_eq!(prompts, vec!["a prompt", "b prompt"]);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry_path = dir.path().join("generated_images.json");
        std::fs::write(&registry_path, "[1, 2, 3").expect("write");

        let registry = ImageRegistry::open(&registry_path);
        assert!(registry.is_empty());
    }

    #[test]
    fn recording_missing_image_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry_path = dir.path().join("generated_images.json");
        let mut registry = ImageRegistry::open(&registry_path);

        let result = registry.record("cat", &dir.path().join("nope.png"));
        assert!(matches!(result, Err(StudioError::PersistenceFailure { .. })));
        assert!(registry.is_empty());
        assert!(!registry_path.exists());
    }

    #[test]
    fn failed_persist_rolls_back_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store_dir = dir.path().join("store");
        std::fs::create_dir_all(&store_dir).expect("create store");
        let first = dir.path().join("image_0.png");
        let second = dir.path().join("image_1.png");
        std::fs::write(&first, b"png").expect("write");
        std::fs::write(&second, b"png").expect("write");

        let mut registry = ImageRegistry::open(store_dir.join("generated_images.json"));
        registry.record("cat", &first).expect("record");

        // Replace the store directory with a plain file so the rewrite fails.
        std::fs::remove_dir_all(&store_dir).expect("remove store");
        std::fs::write(&store_dir, b"not a directory").expect("block store");

        let replaced = registry.record("cat", &second);
        assert!(matches!(replaced, Err(StudioError::PersistenceFailure { .. })));
        assert_eq!(registry.lookup("cat"), Some(first.as_path()));

        let added = registry.record("dog", &second);
        assert!(matches!(added, Err(StudioError::PersistenceFailure { .. })));
        assert_eq!(registry.lookup("dog"), None);
        assert_eq!(registry.len(), 1);
    }
}
