//! Resolution, source and encoding-noise extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{delimited_matches, matches_whole, Scratch};
use crate::model::ParsedName;

static RESOLUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:480p|720p|1080p|1440p|2160p|4k)").expect("resolution regex should compile")
});

// Longer alternatives first; the regex engine is leftmost-first.
static SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:blu-?ray|web-?dl|web-?rip|hdtv|dvd-?rip|bd-?rip|br-?rip|hd-?rip|dvd|web)")
        .expect("source regex should compile")
});

static NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:[xh]\.?26[45]|hevc|avc|xvid|divx|10-?bit|8-?bit|hdr10\+?|hdr|dts-hd(?:[ .]ma)?|dts|truehd|atmos|e?ac-?3|aac(?:[257]\.[01])?|ddp?(?:[257]\.[01])?|flac|remux|proper|repack|uhd)",
    )
    .expect("noise regex should compile")
});

/// Extract resolution and source, then cut encoding noise.
pub(super) fn extract(scratch: &mut Scratch, parsed: &mut ParsedName) {
    if let Some(found) = cut_all(scratch, &RESOLUTION) {
        parsed.resolution = Some(canonical_resolution(&found));
    }
    if let Some(found) = cut_all(scratch, &SOURCE) {
        parsed.source_tag = canonical_source(&found).map(str::to_string);
    }
    cut_all(scratch, &NOISE);
}

/// Whether `token` is entirely a resolution, source or noise marker.
pub(super) fn is_quality_token(token: &str) -> bool {
    matches_whole(&RESOLUTION, token)
        || matches_whole(&SOURCE, token)
        || matches_whole(&NOISE, token)
}

/// Cut every delimited match, returning the text of the first.
fn cut_all(scratch: &mut Scratch, re: &Regex) -> Option<String> {
    let (first, spans) = {
        let matches = delimited_matches(re, scratch.text());
        let first = matches
            .first()
            .and_then(|caps| caps.get(0))
            .map(|m| m.as_str().to_string());
        let spans: Vec<_> = matches
            .iter()
            .filter_map(|caps| caps.get(0))
            .map(|m| (m.start(), m.end()))
            .collect();
        (first, spans)
    };
    scratch.cut(&spans);
    first
}

fn canonical_resolution(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("4k") {
        "4K".to_string()
    } else {
        raw.to_lowercase()
    }
}

fn canonical_source(raw: &str) -> Option<&'static str> {
    let key = raw.to_lowercase().replace('-', "");
    let canonical = match key.as_str() {
        "bluray" => "BluRay",
        "webdl" => "WEB-DL",
        "webrip" => "WEBRip",
        "hdtv" => "HDTV",
        "dvdrip" => "DVDRip",
        "bdrip" => "BDRip",
        "brrip" => "BRRip",
        "hdrip" => "HDRip",
        "dvd" => "DVD",
        "web" => "WEB",
        _ => return None,
    };
    Some(canonical)
}
