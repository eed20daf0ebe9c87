//! `@handle` extraction.

use regex::Regex;
use std::{collections::HashSet, sync::LazyLock};

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"));

/// Distinct handles mentioned in `text`, in order of first appearance.
///
/// Matching is case-sensitive: `@Alice` and `@alice` are different handles.
#[must_use]
pub fn scan_mentions(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();

    MENTION
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|handle| handle.as_str())
        .filter(|handle| seen.insert(*handle))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::mention::scan_mentions;

    #[test]
    fn repeated_mentions_collapse() {
        assert_eq!(
            scan_mentions("hi @alice and @bob, @alice"),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn empty_and_mentionless_text() {
        assert!(scan_mentions("").is_empty());
        assert!(scan_mentions("no handles here @ all").is_empty());
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(scan_mentions("@Alice @alice"), vec!["Alice", "alice"]);
    }

    #[test]
    fn stops_at_non_word_characters() {
        assert_eq!(
            scan_mentions("(@dana_99) @eve-smith @fr@nk"),
            vec!["dana_99", "eve", "fr", "nk"]
        );
    }
}
