//! Title extraction from the marker-stripped name.

use once_cell::sync::Lazy;
use regex::Regex;

use super::SENTINEL;

static BRACKET_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\[\]]*\]|\([^()]*\)|\{[^{}]*\}|【[^【】]*】")
        .expect("bracket group regex should compile")
});

static UNCLOSED_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[({【][^\])}】]*$").expect("unclosed group regex should compile")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

/// Derive the title from text whose markers were replaced by the sentinel.
///
/// Bracket and parenthetical groups become sentinels too. The title is the
/// text before the first sentinel; when that is empty (a leading
/// `[Group]` tag, say) the first non-empty remaining segment is used.
pub(super) fn extract(text: &str) -> String {
    let sentinel = SENTINEL.to_string();
    let collapsed = BRACKET_GROUP.replace_all(text, sentinel.as_str());
    let collapsed = UNCLOSED_GROUP.replace(&collapsed, sentinel.as_str());

    collapsed
        .split(SENTINEL)
        .map(normalize)
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
}

/// Turn `.` and `_` into spaces, collapse whitespace and trim stray dashes.
pub(crate) fn normalize(segment: &str) -> String {
    let spaced = segment.replace(['.', '_'], " ");
    let collapsed = WHITESPACE.replace_all(&spaced, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || c == '-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_before_first_marker() {
        assert_eq!(extract("The.Matrix.|.|.|"), "The Matrix");
        assert_eq!(extract("Show_Name_|"), "Show Name");
    }

    #[test]
    fn bracket_groups_removed() {
        assert_eq!(extract("Show [|]"), "Show");
        assert_eq!(extract("Heat (|) [Remastered]"), "Heat");
    }

    #[test]
    fn leading_group_tag_skipped() {
        assert_eq!(extract("[SubGroup] Anime Title - 01 [|]"), "Anime Title - 01");
        assert_eq!(extract("【字幕组】演示剧|"), "演示剧");
    }

    #[test]
    fn unclosed_trailing_group() {
        assert_eq!(extract("Heat [|"), "Heat");
    }

    #[test]
    fn keeps_inner_hyphen() {
        assert_eq!(extract("Spider-Man.|"), "Spider-Man");
    }

    #[test]
    fn no_markers() {
        assert_eq!(extract("Home  Video"), "Home Video");
        assert_eq!(extract(""), "");
    }
}
