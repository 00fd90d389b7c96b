//! Keyword list loading and `term | timecode` line parsing.
//!
//! The keyword file is plain text, one search term per line. A line may carry
//! a timecode after a `|` (`red panda | 00:01:23`); only the left side is
//! searched.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Keyword files tried in order when none is configured.
pub const DEFAULT_KEYWORD_FILES: [&str; 2] = ["keywords.txt", "../keywords.txt"];

/// Errors reading the keyword list.
#[derive(Debug, Error)]
pub enum KeywordError {
    /// The file exists but could not be read.
    #[error("failed to read keyword file {path}: {source}")]
    Read {
        /// The keyword file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Reads the first existing file among `candidates`.
///
/// Returns the trimmed, non-empty lines, or an empty list when no candidate
/// exists.
///
/// # Errors
///
/// Returns [`KeywordError::Read`] when an existing file cannot be read.
pub async fn load_keywords(candidates: &[PathBuf]) -> Result<Vec<String>, KeywordError> {
    for path in candidates {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            continue;
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| KeywordError::Read {
                path: path.clone(),
                source,
            })?;
        let lines = keyword_lines(&raw);
        debug!(path = %path.display(), count = lines.len(), "loaded keywords");
        return Ok(lines);
    }
    debug!("no keyword file found");
    Ok(Vec::new())
}

/// Default candidate list as paths.
#[must_use]
pub fn default_keyword_files() -> Vec<PathBuf> {
    DEFAULT_KEYWORD_FILES.iter().map(PathBuf::from).collect()
}

fn keyword_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One parsed keyword line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordEntry {
    /// Search term (left of the first `|`).
    pub term: String,
    /// Optional timecode (everything right of the first `|`).
    pub timecode: Option<String>,
    /// `term | timecode`, or just `term`; used for de-duplication.
    pub label: String,
}

impl KeywordEntry {
    /// Parses a line; returns `None` when the term part is empty.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (term, timecode) = match line.split_once('|') {
            Some((term, rest)) => (term.trim(), Some(rest.trim())),
            None => (line.trim(), None),
        };
        if term.is_empty() {
            return None;
        }
        let timecode = timecode.filter(|t| !t.is_empty()).map(str::to_string);
        let label = match &timecode {
            Some(timecode) => format!("{term} | {timecode}"),
            None => term.to_string(),
        };
        Some(Self {
            term: term.to_string(),
            timecode,
            label,
        })
    }
}

/// Parses keyword lines, dropping blank terms and repeated labels.
///
/// The same term may appear several times with different timecodes.
#[must_use]
pub fn parse_keyword_lines<S: AsRef<str>>(lines: &[S]) -> Vec<KeywordEntry> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter_map(|line| KeywordEntry::parse(line.as_ref()))
        .filter(|entry| seen.insert(entry.label.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_keywords_trims_and_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keywords.txt");
        std::fs::write(&path, "  red panda \n\n\t\nsnow leopard | 00:01:02\r\n").unwrap();

        let keywords = load_keywords(&[path]).await.unwrap();
        assert_eq!(keywords, ["red panda", "snow leopard | 00:01:02"]);
    }

    #[tokio::test]
    async fn test_load_keywords_missing_files_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let candidates = [
            temp_dir.path().join("keywords.txt"),
            temp_dir.path().join("other.txt"),
        ];

        let keywords = load_keywords(&candidates).await.unwrap();
        assert!(keywords.is_empty());
    }

    #[tokio::test]
    async fn test_load_keywords_uses_first_existing_candidate() {
        let temp_dir = TempDir::new().unwrap();
        let second = temp_dir.path().join("second.txt");
        std::fs::write(&second, "owl\n").unwrap();

        let candidates = [temp_dir.path().join("first.txt"), second];
        assert_eq!(load_keywords(&candidates).await.unwrap(), ["owl"]);
    }

    #[tokio::test]
    async fn test_load_keywords_directory_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_keywords(&[temp_dir.path().to_path_buf()]).await;
        assert!(matches!(result, Err(KeywordError::Read { .. })));
    }

    #[test]
    fn test_keyword_entry_parse_with_timecode() {
        let entry = KeywordEntry::parse("  red panda | 00:01:23 ").unwrap();
        assert_eq!(entry.term, "red panda");
        assert_eq!(entry.timecode.as_deref(), Some("00:01:23"));
        assert_eq!(entry.label, "red panda | 00:01:23");
    }

    #[test]
    fn test_keyword_entry_parse_keeps_extra_pipes_in_timecode() {
        let entry = KeywordEntry::parse("owl|a|b").unwrap();
        assert_eq!(entry.term, "owl");
        assert_eq!(entry.timecode.as_deref(), Some("a|b"));
    }

    #[test]
    fn test_keyword_entry_parse_empty_timecode_and_term() {
        let entry = KeywordEntry::parse("owl | ").unwrap();
        assert_eq!(entry.timecode, None);
        assert_eq!(entry.label, "owl");

        assert!(KeywordEntry::parse(" | 00:00:05").is_none());
        assert!(KeywordEntry::parse("   ").is_none());
    }

    #[test]
    fn test_parse_keyword_lines_dedupes_by_label() {
        let entries = parse_keyword_lines(&[
            "owl | 00:01",
            "owl | 00:02",
            "owl|00:01",
            "cat",
            "cat ",
        ]);
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["owl | 00:01", "owl | 00:02", "cat"]);
    }
}
