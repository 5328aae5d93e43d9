//! Season and episode marker extraction.
//!
//! Recognises `S01E02`, `Season 1 Episode 2`, season packs (`S01`) and the
//! localized `第N季第M集` form with Arabic or Chinese numerals.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{delimited_matches, matches_whole, Scratch};
use crate::model::ParsedName;

static SXXEXX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)s(\d{1,2})[ ._-]?e(\d{1,3})(?:[ ._-]?e\d{1,3})*")
        .expect("SxxExx regex should compile")
});

static SEASON_EPISODE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)season[ ._-]*(\d{1,2})[ ._-]*episode[ ._-]*(\d{1,3})")
        .expect("season/episode words regex should compile")
});

static LOCALIZED_SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"第\s*([0-9零〇一二两三四五六七八九十百]+)\s*季(?:\s*第\s*([0-9零〇一二两三四五六七八九十百]+)\s*[集话話])?",
    )
    .expect("localized season regex should compile")
});

static LOCALIZED_EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"第\s*([0-9零〇一二两三四五六七八九十百]+)\s*[集话話]")
        .expect("localized episode regex should compile")
});

static SEASON_PACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:s(\d{2})|season[ ._-]*(\d{1,2}))")
        .expect("season pack regex should compile")
});

/// Extract season/episode markers, cutting every occurrence from `scratch`.
///
/// The first marker found sets the fields; later ones only fill gaps.
pub(super) fn extract(scratch: &mut Scratch, parsed: &mut ParsedName) {
    apply(scratch, parsed, &SXXEXX, true, |caps| {
        (number(caps, 1), number(caps, 2))
    });
    apply(scratch, parsed, &SEASON_EPISODE_WORDS, true, |caps| {
        (number(caps, 1), number(caps, 2))
    });
    // CJK text has no delimiters around markers
    apply(scratch, parsed, &LOCALIZED_SEASON, false, |caps| {
        (numeral(caps, 1), numeral(caps, 2))
    });
    apply(scratch, parsed, &LOCALIZED_EPISODE, false, |caps| {
        (None, numeral(caps, 1))
    });
    apply(scratch, parsed, &SEASON_PACK, true, |caps| {
        (number(caps, 1).or_else(|| number(caps, 2)), None)
    });
}

/// Whether `token` is entirely an episode or season marker.
pub(super) fn is_episode_token(token: &str) -> bool {
    matches_whole(&SXXEXX, token) || matches_whole(&SEASON_PACK, token)
}

fn apply<F>(scratch: &mut Scratch, parsed: &mut ParsedName, re: &Regex, delimited: bool, read: F)
where
    F: Fn(&Captures<'_>) -> (Option<u32>, Option<u32>),
{
    let spans: Vec<(usize, usize)> = {
        let text = scratch.text();
        let matches = if delimited {
            delimited_matches(re, text)
        } else {
            re.captures_iter(text).collect()
        };

        let mut spans = Vec::with_capacity(matches.len());
        for caps in &matches {
            let (season, episode) = read(caps);
            parsed.season = parsed.season.or(season);
            parsed.episode = parsed.episode.or(episode);
            if let Some(m) = caps.get(0) {
                spans.push((m.start(), m.end()));
            }
        }
        spans
    };
    scratch.cut(&spans);
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

fn numeral(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| parse_numeral(m.as_str()))
}

/// Parse Arabic digits or a Chinese numeral (`十二`, `二十三`, `一百零五`).
pub(crate) fn parse_numeral(s: &str) -> Option<u32> {
    if let Ok(n) = s.parse() {
        return Some(n);
    }

    let mut total = 0u32;
    let mut current = 0u32;
    for c in s.chars() {
        let digit = match c {
            '零' | '〇' => 0,
            '一' => 1,
            '二' | '两' => 2,
            '三' => 3,
            '四' => 4,
            '五' => 5,
            '六' => 6,
            '七' => 7,
            '八' => 8,
            '九' => 9,
            '十' | '百' => {
                let unit = if c == '十' { 10 } else { 100 };
                total += current.max(1) * unit;
                current = 0;
                continue;
            }
            _ => return None,
        };
        current = digit;
    }

    Some(total + current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> (ParsedName, String) {
        let mut scratch = Scratch::new(input);
        let mut parsed = ParsedName::default();
        extract(&mut scratch, &mut parsed);
        (parsed, scratch.text().to_string())
    }

    #[test]
    fn sxxexx_marker() {
        let (parsed, rest) = run("Show.S01E02.720p");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(2));
        assert_eq!(rest, "Show.|.720p");
    }

    #[test]
    fn multi_episode_marker_keeps_first() {
        let (parsed, rest) = run("Show.S02E03E04");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(3));
        assert_eq!(rest, "Show.|");
    }

    #[test]
    fn bracketed_marker_leaves_brackets_for_cleanup() {
        let (parsed, rest) = run("Show [S01E02]");
        assert_eq!(parsed.episode, Some(2));
        assert_eq!(rest, "Show [|]");
    }

    #[test]
    fn season_episode_words() {
        let (parsed, _) = run("Show Season 3 Episode 10");
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, Some(10));
    }

    #[test]
    fn localized_marker_chinese_numerals() {
        let (parsed, rest) = run("演示剧第二季第十二集");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(12));
        assert_eq!(rest, "演示剧|");
    }

    #[test]
    fn localized_marker_arabic_numerals() {
        let (parsed, _) = run("演示剧 第1季 第3集");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(3));
    }

    #[test]
    fn localized_episode_only() {
        let (parsed, _) = run("演示剧第5集");
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.episode, Some(5));
    }

    #[test]
    fn season_pack() {
        let (parsed, _) = run("Show.S03.1080p");
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn marker_inside_word_is_ignored() {
        let (parsed, rest) = run("Classics01E02");
        assert!(!parsed.has_episode_marker());
        assert_eq!(rest, "Classics01E02");
    }

    #[test]
    fn chinese_numerals() {
        assert_eq!(parse_numeral("一"), Some(1));
        assert_eq!(parse_numeral("十"), Some(10));
        assert_eq!(parse_numeral("十二"), Some(12));
        assert_eq!(parse_numeral("二十"), Some(20));
        assert_eq!(parse_numeral("二十三"), Some(23));
        assert_eq!(parse_numeral("一百零五"), Some(105));
        assert_eq!(parse_numeral("07"), Some(7));
        assert_eq!(parse_numeral("abc"), None);
    }
}
