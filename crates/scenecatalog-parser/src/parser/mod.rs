//! Regex-driven filename parser.
//!
//! Recognised markers are cut out of a working copy of the name and replaced
//! with a sentinel, in order of specificity: episode markers, then the year,
//! then quality and encoding tokens. Bracket groups are collapsed last and the
//! title is whatever precedes the first sentinel.

mod episode;
mod metadata;
mod quality;
mod title;

use regex::Regex;

use crate::model::ParsedName;

/// Placeholder left where a marker was removed.
pub(crate) const SENTINEL: char = '|';

/// Working copy of the name with recognised markers cut out.
pub(crate) struct Scratch {
    text: String,
    markers: usize,
}

impl Scratch {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            markers: 0,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Replace the given byte spans with the sentinel.
    ///
    /// Spans must be sorted and non-overlapping.
    pub(crate) fn cut(&mut self, spans: &[(usize, usize)]) {
        if spans.is_empty() {
            return;
        }
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for &(start, end) in spans {
            out.push_str(&self.text[last..start]);
            out.push(SENTINEL);
            last = end;
        }
        out.push_str(&self.text[last..]);
        self.text = out;
        self.markers += spans.len();
    }
}

/// Whether the match at `start..end` stands alone between delimiters.
///
/// `_` counts as a delimiter here, which is why `\b` is not used in the
/// patterns themselves.
pub(crate) fn is_delimited(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.map_or(true, |c| !c.is_alphanumeric()) && after.map_or(true, |c| !c.is_alphanumeric())
}

/// Delimited matches of `re` in `text`, in order.
pub(crate) fn delimited_matches<'t>(re: &Regex, text: &'t str) -> Vec<regex::Captures<'t>> {
    re.captures_iter(text)
        .filter(|caps| {
            caps.get(0)
                .is_some_and(|m| is_delimited(text, m.start(), m.end()))
        })
        .collect()
}

/// Whether `re` matches the whole of `token`.
pub(crate) fn matches_whole(re: &Regex, token: &str) -> bool {
    re.find(token)
        .is_some_and(|m| m.start() == 0 && m.end() == token.len())
}

/// Whether `token` is, in its entirety, a quality/encoding/episode marker.
pub(crate) fn is_marker_token(token: &str) -> bool {
    quality::is_quality_token(token) || episode::is_episode_token(token)
}

/// Parse a filename into its structured fields.
pub fn parse(input: &str) -> ParsedName {
    let name = metadata::strip_extension(input.trim());

    if let Some((body, group)) = metadata::split_release_group(name) {
        let (parsed, markers) = parse_body(body);
        if markers > 0 {
            return ParsedName {
                release_group: Some(group.to_string()),
                ..parsed
            };
        }
    }

    parse_body(name).0
}

/// Run every extractor over `body`, returning the fields and marker count.
fn parse_body(body: &str) -> (ParsedName, usize) {
    let mut scratch = Scratch::new(body);
    let mut parsed = ParsedName::default();

    // Episode markers go first so `[S01E02]` is gone before bracket cleanup
    episode::extract(&mut scratch, &mut parsed);
    metadata::extract_year(&mut scratch, &mut parsed);
    quality::extract(&mut scratch, &mut parsed);

    parsed.title = title::extract(scratch.text());
    (parsed, scratch.markers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_cut_replaces_spans() {
        let mut scratch = Scratch::new("Heat.1995.1080p");
        scratch.cut(&[(5, 9), (10, 15)]);
        assert_eq!(scratch.text(), "Heat.|.|");
        assert_eq!(scratch.markers, 2);
    }

    #[test]
    fn delimiters_include_underscore() {
        assert!(is_delimited("Heat_1995_x", 5, 9));
        assert!(!is_delimited("Heat1995", 4, 8));
        assert!(is_delimited("1995", 0, 4));
    }

    #[test]
    fn marker_tokens() {
        assert!(is_marker_token("1080p"));
        assert!(is_marker_token("WEB-DL"));
        assert!(is_marker_token("x264"));
        assert!(is_marker_token("S01E02"));
        assert!(!is_marker_token("GROUP"));
        assert!(!is_marker_token("mkv"));
    }
}
