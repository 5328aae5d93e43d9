//! Path helpers for recognising media files and naming their folders.
//!
//! The scanner only cares about video payloads; anything else on a share
//! (subtitles, artwork, NFO files) is skipped during the walk.

use std::path::Path;

/// Video file extensions that are picked up during a scan.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "m2ts", "webm", "mov", "wmv", "flv", "mpg", "mpeg", "rmvb",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use scenecatalog_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/share/TV/Show/S01E01.M2TS")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Name of the directory directly containing `path`, if any.
///
/// ```
/// use std::path::Path;
/// use scenecatalog_common::paths::parent_dir_name;
///
/// assert_eq!(parent_dir_name(Path::new("/share/Movies/Heat.mkv")), Some("Movies"));
/// assert_eq!(parent_dir_name(Path::new("Heat.mkv")), None);
/// ```
pub fn parent_dir_name(path: &Path) -> Option<&str> {
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
}

/// Render a path with forward slashes, for stable storage and id derivation.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
