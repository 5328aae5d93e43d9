//! Turn classified files into catalog items.
//!
//! Movies and unknown files become one item each, keyed by file path. TV
//! episodes are grouped into one series item per (series directory,
//! normalized title); the series directory is the nearest parent that is not
//! a season folder.

use std::collections::BTreeMap;
use std::path::Path;

use scenecatalog_common::paths::{is_video_file, to_slash};
use scenecatalog_common::MediaKind;
use scenecatalog_db::models::{CatalogItem, EpisodeRef};
use tracing::debug;

use super::classifier::MediaClassifier;
use crate::storage::RawFile;

/// Result of grouping one discovery pass.
#[derive(Debug, Default)]
pub struct Grouping {
    /// Items ordered by `primary_path`
    pub items: Vec<CatalogItem>,
    /// Directories, non-video files and unnamed entries
    pub skipped: u64,
}

#[derive(Debug, Default)]
pub struct MediaGrouper {
    classifier: MediaClassifier,
}

struct SeriesDraft {
    title: String,
    dir: String,
    year: Option<u16>,
    episodes: Vec<EpisodeRef>,
}

impl MediaGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grouper for files below a share mounted at `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            classifier: MediaClassifier::with_root(root),
        }
    }

    pub fn group(&self, files: &[RawFile]) -> Grouping {
        let mut grouping = Grouping::default();
        let mut singles: BTreeMap<String, CatalogItem> = BTreeMap::new();
        let mut series: BTreeMap<(String, String), SeriesDraft> = BTreeMap::new();

        for file in files {
            if file.is_directory
                || file.display_name.is_empty()
                || !is_video_file(Path::new(&file.display_name))
            {
                grouping.skipped += 1;
                continue;
            }

            let classification = self.classifier.classify(file);
            let parsed = classification.parsed;

            if classification.kind != MediaKind::Tv {
                let title = if parsed.title.is_empty() {
                    fallback_title(&file.path)
                } else {
                    parsed.title
                };
                if title.is_empty() {
                    debug!(path = %file.path, "No usable title, skipping");
                    grouping.skipped += 1;
                    continue;
                }
                let item = CatalogItem::new(title, parsed.year, classification.kind, file.path.clone());
                singles.insert(file.path.clone(), item);
                continue;
            }

            let (series_dir, dir_season) = series_dir(&file.path);
            let dir_name = Path::new(&series_dir)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let dir_parsed = scenecatalog_parser::parse(&dir_name);

            let title = if parsed.title.is_empty() {
                dir_parsed.title.clone()
            } else {
                parsed.title.clone()
            };
            if title.is_empty() {
                debug!(path = %file.path, "No usable series title, skipping");
                grouping.skipped += 1;
                continue;
            }

            let episode = EpisodeRef {
                path: file.path.clone(),
                season: parsed.season.or(dir_season).or(dir_parsed.season).unwrap_or(1),
                episode: parsed.episode,
                name: file.display_name.clone(),
            };

            let key = (series_dir.clone(), normalize(&title));
            let draft = series.entry(key).or_insert_with(|| SeriesDraft {
                title: title.clone(),
                dir: series_dir.clone(),
                year: None,
                episodes: Vec::new(),
            });
            draft.year = draft.year.or(parsed.year).or(dir_parsed.year);
            draft.episodes.push(episode);
        }

        for draft in series.into_values() {
            let dir_title = scenecatalog_parser::parse(
                Path::new(&draft.dir)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default(),
            )
            .title;

            let primary_path = if normalize(&dir_title) == normalize(&draft.title) {
                draft.dir.clone()
            } else {
                format!("{}/{}", draft.dir.trim_end_matches('/'), draft.title)
            };

            let mut item = CatalogItem::new(draft.title, draft.year, MediaKind::Tv, primary_path);
            item.merge_episodes(&draft.episodes);
            singles.insert(item.primary_path.clone(), item);
        }

        grouping.items = singles.into_values().collect();
        grouping
    }
}

/// Nearest parent directory that is not a season folder, plus the season
/// number of a season folder passed on the way.
fn series_dir(path: &str) -> (String, Option<u32>) {
    let mut season = None;
    let mut current = Path::new(path).parent();

    while let Some(dir) = current {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            break;
        };
        match season_folder(name) {
            Some(number) => {
                season = season.or(number);
                current = dir.parent();
            }
            None => return (to_slash(dir), season),
        }
    }

    let fallback = Path::new(path).parent().map(to_slash).unwrap_or_default();
    (fallback, season)
}

/// `Some(season)` when `name` is a season folder (`Season 2`, `S02`,
/// `Specials`, `第二季`).
fn season_folder(name: &str) -> Option<Option<u32>> {
    if name.eq_ignore_ascii_case("specials") {
        return Some(Some(0));
    }
    let parsed = scenecatalog_parser::parse(name);
    if parsed.title.is_empty() && parsed.season.is_some() && parsed.episode.is_none() {
        Some(parsed.season)
    } else {
        None
    }
}

fn fallback_title(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.replace(['.', '_'], " ").trim().to_string()
}

/// Lower-case alphanumeric words joined by single spaces.
pub fn normalize(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
