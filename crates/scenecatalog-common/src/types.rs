//! Core type definitions shared by the parser, the catalog store and the
//! resolution pipeline.
//!
//! All enums serialize in lowercase (`ai-enhanced` is kebab-case) so the
//! values stored in the database and sent to the community registry match
//! their `Display` output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a catalog item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A single movie.
    Movie,
    /// A TV series with grouped episodes.
    Tv,
    /// Not yet determined.
    #[default]
    Unknown,
}

impl MediaKind {
    /// Returns `true` for `Movie` and `Tv`.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Tv => write!(f, "tv"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" | "film" => Ok(Self::Movie),
            "tv" | "series" | "show" => Ok(Self::Tv),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// Which resolution tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    /// Direct search with the parsed title.
    Exact,
    /// Search with rewritten title variants.
    Fuzzy,
    /// Search guided by the language-model recognizer.
    AiEnhanced,
    /// Free-text web search fallback.
    Web,
    /// Identification reused from the community hash registry.
    Community,
    /// No tier produced an acceptable match.
    Failed,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::AiEnhanced => write!(f, "ai-enhanced"),
            Self::Web => write!(f, "web"),
            Self::Community => write!(f, "community"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "fuzzy" => Ok(Self::Fuzzy),
            "ai-enhanced" => Ok(Self::AiEnhanced),
            "web" => Ok(Self::Web),
            "community" => Ok(Self::Community),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid match method: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_serialization() {
        let json = serde_json::to_string(&MediaKind::Tv).unwrap();
        assert_eq!(json, r#""tv""#);

        let kind: MediaKind = serde_json::from_str(r#""movie""#).unwrap();
        assert_eq!(kind, MediaKind::Movie);
    }

    #[test]
    fn test_media_kind_display_fromstr_roundtrip() {
        for kind in [MediaKind::Movie, MediaKind::Tv, MediaKind::Unknown] {
            let parsed: MediaKind = kind.to_string().parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert_eq!("Series".parse::<MediaKind>().unwrap(), MediaKind::Tv);
        assert!("music".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_media_kind_default_unknown() {
        assert_eq!(MediaKind::default(), MediaKind::Unknown);
        assert!(!MediaKind::Unknown.is_known());
        assert!(MediaKind::Movie.is_known());
    }

    #[test]
    fn test_match_method_serialization() {
        let json = serde_json::to_string(&MatchMethod::AiEnhanced).unwrap();
        assert_eq!(json, r#""ai-enhanced""#);
        assert_eq!(MatchMethod::AiEnhanced.to_string(), "ai-enhanced");
    }

    #[test]
    fn test_match_method_display_fromstr_roundtrip() {
        for method in [
            MatchMethod::Exact,
            MatchMethod::Fuzzy,
            MatchMethod::AiEnhanced,
            MatchMethod::Web,
            MatchMethod::Community,
            MatchMethod::Failed,
        ] {
            let parsed: MatchMethod = method.to_string().parse().unwrap();
            assert_eq!(method, parsed);
        }
    }
}
