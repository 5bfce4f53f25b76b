/// Appends `tag` to a comma-separated prompt unless a fragment already equals it.
pub fn append_tag(current: &str, tag: &str) -> String {
    let tag = tag.trim();
    let current = current.trim();
    if current.is_empty() {
        return tag.to_string();
    }
    if tag.is_empty() || current.split(',').any(|fragment| fragment.trim() == tag) {
        return current.to_string();
    }

    let composed = format!("{}, {}", current, tag);
    log::debug!("Appending tag '{}' to prompt. New prompt: '{}'", tag, composed);
    composed
}

#[cfg(test)]
mod tests {
    use super::append_tag;

    #[test]
    fn empty_prompt_becomes_tag() {
        assert_eq!(append_tag("", "smile"), "smile");
        assert_eq!(append_tag("   ", "smile"), "smile");
    }

    #[test]
    fn appends_new_tag() {
        assert_eq!(append_tag("1girl, long hair", "smile"), "1girl, long hair, smile");
    }

    #[test]
    fn existing_fragment_is_not_duplicated() {
        assert_eq!(append_tag("1girl,smile ,cat", "smile"), "1girl,smile ,cat");
    }

    #[test]
    fn substring_of_fragment_still_appends() {
        assert_eq!(append_tag("smiley face", "smile"), "smiley face, smile");
    }
}
