//! The parsed representation of a filename.

use std::fmt;

/// Structured fields extracted from a filename.
///
/// Every field except `title` is optional; an unrecognised name yields its
/// cleaned text as the title and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedName {
    /// Cleaned title, separators collapsed to single spaces.
    pub title: String,
    /// Release year (the last plausible year in the name).
    pub year: Option<u16>,
    /// Resolution in canonical case (`1080p`, `4K`, ...).
    pub resolution: Option<String>,
    /// Source tag in canonical case (`BluRay`, `WEB-DL`, ...).
    pub source_tag: Option<String>,
    /// Season number.
    pub season: Option<u32>,
    /// Episode number within the season.
    pub episode: Option<u32>,
    /// Trailing `-GROUP` suffix, when the name carried other markers.
    pub release_group: Option<String>,
}

impl ParsedName {
    /// Returns `true` when a season or episode marker was found.
    pub fn has_episode_marker(&self) -> bool {
        self.season.is_some() || self.episode.is_some()
    }
}

impl fmt::Display for ParsedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(year) = self.year {
            write!(f, " ({})", year)?;
        }
        match (self.season, self.episode) {
            (Some(s), Some(e)) => write!(f, " S{:02}E{:02}", s, e)?,
            (Some(s), None) => write!(f, " S{:02}", s)?,
            (None, Some(e)) => write!(f, " E{:02}", e)?,
            (None, None) => {}
        }
        if let Some(ref res) = self.resolution {
            write!(f, " [{}]", res)?;
        }
        if let Some(ref source) = self.source_tag {
            write!(f, " [{}]", source)?;
        }
        Ok(())
    }
}
