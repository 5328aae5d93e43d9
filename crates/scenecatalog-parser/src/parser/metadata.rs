//! Extension, release group and year handling.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{delimited_matches, is_marker_token, Scratch};
use crate::model::ParsedName;

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").expect("year regex should compile"));

static RELEASE_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-([A-Za-z0-9]+)$").expect("release group regex should compile")
});

/// Remove a trailing file extension.
///
/// A 2-4 character alphanumeric suffix that is not purely numeric and not
/// itself a marker (`Movie.4K`, `Show.S01`) counts as an extension.
pub(super) fn strip_extension(name: &str) -> &str {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return name;
    };

    let looks_like_extension = (2..=4).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic())
        && !is_marker_token(ext);

    if looks_like_extension && !stem.is_empty() {
        stem
    } else {
        name
    }
}

/// Split a trailing `-GROUP` suffix off `name`.
///
/// Returns `None` when there is no suffix or the hyphen belongs to a marker
/// such as `WEB-DL` or `DTS-HD`.
pub(super) fn split_release_group(name: &str) -> Option<(&str, &str)> {
    let caps = RELEASE_GROUP.captures(name)?;
    let whole = caps.get(0)?;
    let group = caps.get(1)?.as_str();

    let last_segment = name
        .rsplit(|c: char| c == '.' || c == ' ' || c == '_' || c == '[' || c == '(')
        .next()
        .unwrap_or(name);
    if is_marker_token(last_segment) {
        return None;
    }

    let body = &name[..whole.start()];
    if body.trim().is_empty() {
        return None;
    }
    Some((body, group))
}

/// Extract the release year: the last delimited `19xx`/`20xx`.
///
/// A year at the very start of the name is part of the title (`1917`,
/// `2012`), so it only counts when nothing else follows. Only the chosen
/// year is cut; earlier years stay in the title (`Blade Runner 2049`).
pub(super) fn extract_year(scratch: &mut Scratch, parsed: &mut ParsedName) {
    let span = {
        let text = scratch.text();
        delimited_matches(&YEAR, text)
            .iter()
            .filter_map(|caps| caps.get(0))
            .filter(|m| m.start() > 0)
            .last()
            .map(|m| (m.start(), m.end(), m.as_str().parse::<u16>().ok()))
    };

    if let Some((start, end, year)) = span {
        parsed.year = year;
        scratch.cut(&[(start, end)]);
    }
}
