use serde_json::Value;
use std::path::Path;

/// Flat list of candidate prompt strings.
#[derive(Debug, Clone, Default)]
pub struct PromptCorpus {
    prompts: Vec<String>,
}

impl PromptCorpus {
    pub fn new(prompts: Vec<String>) -> Self {
        Self { prompts }
    }

    /// Loads a JSON array of strings. Anything else yields an empty corpus;
    /// non-string members are skipped.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                log::error!(
                    "Failed to load prompt dataset from {}: {}",
                    path.display(),
                    error
                );
                return Self::default();
            }
        };

        let corpus = Self::from_json_str(&content);
        log::debug!(
            "Loaded {} prompts from {}",
            corpus.prompts.len(),
            path.display()
        );
        corpus
    }

    pub fn from_json_str(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(error) => {
                log::error!("Prompt dataset is not valid JSON: {}", error);
                return Self::default();
            }
        };

        let Value::Array(entries) = value else {
            log::warn!("Prompt dataset is not a JSON array; using an empty corpus");
            return Self::default();
        };

        let prompts = entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(prompt) => Some(prompt),
                _ => None,
            })
            .collect();
        Self { prompts }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_array_and_skips_other_members() {
        let corpus = PromptCorpus::from_json_str(r#"["1girl, smile", 4, null, "cat, outdoors"]"#);
        assert_eq!(corpus.prompts(), ["1girl, smile", "cat, outdoors"]);
    }

    #[test]
    fn non_array_document_is_empty() {
        assert!(PromptCorpus::from_json_str(r#"{"prompts": ["a"]}"#).is_empty());
        assert!(PromptCorpus::from_json_str("not json").is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(PromptCorpus::load(&dir.path().join("nope.json")).is_empty());
    }
}
