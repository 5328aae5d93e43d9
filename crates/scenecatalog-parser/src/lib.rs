//! # scenecatalog-parser
//!
//! Turns a media filename into a [`ParsedName`]: title, release year,
//! resolution, source tag, season/episode markers and release group.
//!
//! Parsing never fails. Fields that cannot be recognised are left empty and
//! the title falls back to whatever text remains.
//!
//! ```
//! use scenecatalog_parser::parse;
//!
//! let parsed = parse("Inception.2010.1080p.BluRay.x264-GROUP.mkv");
//! assert_eq!(parsed.title, "Inception");
//! assert_eq!(parsed.year, Some(2010));
//! assert_eq!(parsed.resolution.as_deref(), Some("1080p"));
//! assert_eq!(parsed.source_tag.as_deref(), Some("BluRay"));
//! assert_eq!(parsed.release_group.as_deref(), Some("GROUP"));
//! ```

pub mod model;
mod parser;

pub use model::ParsedName;

/// Parse a filename (with or without extension) into structured fields.
///
/// # Examples
///
/// ```
/// use scenecatalog_parser::parse;
///
/// let parsed = parse("Show.S01E02.720p.HDTV.mkv");
/// assert_eq!(parsed.title, "Show");
/// assert_eq!(parsed.season, Some(1));
/// assert_eq!(parsed.episode, Some(2));
/// ```
pub fn parse(input: &str) -> ParsedName {
    parser::parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movie() {
        let result = parse("The.Matrix.1999.1080p.BluRay.x264-GROUP");
        assert_eq!(result.title, "The Matrix");
        assert_eq!(result.year, Some(1999));
        assert_eq!(result.resolution.as_deref(), Some("1080p"));
        assert_eq!(result.source_tag.as_deref(), Some("BluRay"));
        assert_eq!(result.release_group.as_deref(), Some("GROUP"));
        assert!(!result.has_episode_marker());
    }

    #[test]
    fn test_parse_tv_episode() {
        let result = parse("Breaking.Bad.S01E01.720p.BluRay.x264-DEMAND.mkv");
        assert_eq!(result.title, "Breaking Bad");
        assert_eq!(result.season, Some(1));
        assert_eq!(result.episode, Some(1));
        assert_eq!(result.resolution.as_deref(), Some("720p"));
        assert!(result.has_episode_marker());
    }

    #[test]
    fn test_parse_4k_movie() {
        let result = parse("Inception.2010.2160p.UHD.BluRay.x265.HDR.DTS-HD.MA.5.1-RELEASE");
        assert_eq!(result.title, "Inception");
        assert_eq!(result.year, Some(2010));
        assert_eq!(result.resolution.as_deref(), Some("2160p"));
        assert_eq!(result.release_group.as_deref(), Some("RELEASE"));
    }

    #[test]
    fn test_parse_web_release() {
        let result = parse("Movie.2023.1080p.AMZN.WEB-DL.DDP5.1.H.264-GROUP");
        assert_eq!(result.source_tag.as_deref(), Some("WEB-DL"));
        assert_eq!(result.year, Some(2023));
    }

    #[test]
    fn test_parse_plain_name() {
        let result = parse("Home Video.mkv");
        assert_eq!(result.title, "Home Video");
        assert_eq!(result.year, None);
        assert_eq!(result.resolution, None);
        assert_eq!(result.source_tag, None);
        assert_eq!(result.release_group, None);
    }

    #[test]
    fn test_parse_empty_input() {
        let result = parse("");
        assert_eq!(result, ParsedName::default());
    }
}
