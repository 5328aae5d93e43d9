//! Media kind classification for discovered files.
//!
//! Rules, in priority order:
//!
//! 1. Path keywords below the share root. The directory nearest the file
//!    wins; within one directory name TV keywords are checked before movie
//!    keywords.
//! 2. A season/episode marker in the file name means TV.
//! 3. A year without any season/episode marker means movie.
//! 4. Otherwise the kind is unknown.

use std::path::Path;

use scenecatalog_common::paths::to_slash;
use scenecatalog_common::MediaKind;
use scenecatalog_parser::ParsedName;

use crate::storage::RawFile;

const TV_KEYWORDS: &[&str] = &[
    "tv", "tvs", "series", "season", "seasons", "episode", "episodes",
];
const MOVIE_KEYWORDS: &[&str] = &["movie", "movies", "film", "films"];

/// Why a file got its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationReason {
    PathKeyword,
    EpisodeMarker,
    YearOnly,
    Undetermined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: MediaKind,
    pub reason: ClassificationReason,
    pub parsed: ParsedName,
}

/// Classifies raw files as movie, TV or unknown.
#[derive(Debug, Default)]
pub struct MediaClassifier {
    /// Share mount point; its own segments never count as keywords.
    root: Option<String>,
}

impl MediaClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = to_slash(root.as_ref()).trim_end_matches('/').to_string();
        Self {
            root: Some(root).filter(|r| !r.is_empty()),
        }
    }

    pub fn classify(&self, file: &RawFile) -> Classification {
        let parsed = scenecatalog_parser::parse(&file.display_name);

        let (kind, reason) = if let Some(kind) = self.kind_from_path(&file.path) {
            (kind, ClassificationReason::PathKeyword)
        } else if parsed.has_episode_marker() {
            (MediaKind::Tv, ClassificationReason::EpisodeMarker)
        } else if parsed.year.is_some() {
            (MediaKind::Movie, ClassificationReason::YearOnly)
        } else {
            (MediaKind::Unknown, ClassificationReason::Undetermined)
        };

        Classification {
            kind,
            reason,
            parsed,
        }
    }

    /// Kind implied by the directories above the file, nearest first.
    fn kind_from_path(&self, path: &str) -> Option<MediaKind> {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root))
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(path);
        let parent = Path::new(relative).parent()?;

        parent
            .iter()
            .rev()
            .filter_map(|segment| segment.to_str())
            .find_map(keyword_kind)
    }
}

fn keyword_kind(segment: &str) -> Option<MediaKind> {
    let lowered = segment.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| TV_KEYWORDS.contains(w)) {
        Some(MediaKind::Tv)
    } else if words.iter().any(|w| MOVIE_KEYWORDS.contains(w)) {
        Some(MediaKind::Movie)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> RawFile {
        RawFile {
            path: path.to_string(),
            display_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            size: 1,
            modified_time: None,
            is_directory: false,
        }
    }

    fn kind(path: &str) -> (MediaKind, ClassificationReason) {
        let c = MediaClassifier::new().classify(&file(path));
        (c.kind, c.reason)
    }

    #[test]
    fn test_path_keywords() {
        assert_eq!(
            kind("/share/TV Shows/Lost/Lost.mkv"),
            (MediaKind::Tv, ClassificationReason::PathKeyword)
        );
        assert_eq!(
            kind("/share/Movies/Heat/Heat.mkv"),
            (MediaKind::Movie, ClassificationReason::PathKeyword)
        );
        assert_eq!(kind("/share/Films/x.mkv").0, MediaKind::Movie);
        assert_eq!(kind("/share/Series/x.mkv").0, MediaKind::Tv);
    }

    #[test]
    fn test_nearest_segment_wins() {
        assert_eq!(kind("/share/Movies/Documentary Series/x.mkv").0, MediaKind::Tv);
        assert_eq!(kind("/share/TV/Movie Nights/x.mkv").0, MediaKind::Movie);
    }

    #[test]
    fn test_tv_keyword_checked_first_in_segment() {
        assert_eq!(kind("/share/Movie Series/x.mkv").0, MediaKind::Tv);
    }

    #[test]
    fn test_keywords_are_whole_words() {
        // "tvland" and "filmography" are not keywords
        assert_eq!(kind("/share/tvland/x.mkv").0, MediaKind::Unknown);
        assert_eq!(kind("/share/filmography/x.mkv").0, MediaKind::Unknown);
    }

    #[test]
    fn test_file_name_rules() {
        assert_eq!(
            kind("/share/Stuff/Show.S01E02.mkv"),
            (MediaKind::Tv, ClassificationReason::EpisodeMarker)
        );
        assert_eq!(
            kind("/share/Stuff/Heat.1995.1080p.mkv"),
            (MediaKind::Movie, ClassificationReason::YearOnly)
        );
        assert_eq!(
            kind("/share/Stuff/holiday.mkv"),
            (MediaKind::Unknown, ClassificationReason::Undetermined)
        );
    }

    #[test]
    fn test_share_root_is_not_a_keyword() {
        let classifier = MediaClassifier::with_root("/mnt/tv/");
        let c = classifier.classify(&file("/mnt/tv/Heat.1995.mkv"));
        assert_eq!((c.kind, c.reason), (MediaKind::Movie, ClassificationReason::YearOnly));

        let c = classifier.classify(&file("/mnt/tv/Movies/x.mkv"));
        assert_eq!((c.kind, c.reason), (MediaKind::Movie, ClassificationReason::PathKeyword));

        // A sibling that merely shares the prefix is not under the root.
        let c = classifier.classify(&file("/mnt/tvx/Series/x.mkv"));
        assert_eq!(c.kind, MediaKind::Tv);
    }

    #[test]
    fn test_file_name_ignored_for_path_rule() {
        // The file name itself is not a path segment
        assert_eq!(kind("/share/Stuff/movie.mkv").0, MediaKind::Unknown);
    }
}
