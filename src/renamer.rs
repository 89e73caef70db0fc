//! Recursive LLM-driven file renaming

use crate::config::RenameConfig;
use crate::llm::{LLMError, LLM};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Quote characters removed from model answers, wherever they appear
const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Failure while renaming a single file or walking the target tree.
///
/// Every variant names the path it concerns.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("LLM returned an empty file name for {}", path.display())]
    EmptyName { path: PathBuf },

    #[error("LLM returned an unusable file name {name:?} for {}", path.display())]
    InvalidName { path: PathBuf, name: String },

    #[error("failed to get a new name for {}: {source}", path.display())]
    Llm {
        path: PathBuf,
        #[source]
        source: LLMError,
    },

    #[error("failed to rename {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read directory entry under {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },
}

impl RenameError {
    /// Path the failure refers to
    pub fn path(&self) -> &Path {
        match self {
            RenameError::EmptyName { path }
            | RenameError::InvalidName { path, .. }
            | RenameError::Llm { path, .. }
            | RenameError::Io { path, .. }
            | RenameError::Walk { path, .. }
            | RenameError::NotADirectory { path } => path,
        }
    }
}

/// A completed rename
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenamedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A file the batch gave up on while continuing past errors
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub renamed: Vec<RenamedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.renamed.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// How a batch reacts to a failed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenamePolicy {
    /// Return the first error and leave remaining files alone
    pub stop_on_first_error: bool,
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self {
            stop_on_first_error: true,
        }
    }
}

impl From<&RenameConfig> for RenamePolicy {
    fn from(config: &RenameConfig) -> Self {
        Self {
            stop_on_first_error: config.stop_on_first_error,
        }
    }
}

/// Prompt asking for a reworded title of `stem`
pub fn build_rename_prompt(stem: &str) -> String {
    format!(
        "Rewrite the title \"{}\" as a more attractive title. It must be worded completely \
         differently from the original but keep the same meaning. Answer with the new title only \
         and nothing else.",
        stem
    )
}

/// Trim whitespace and drop straight and curly quotes.
///
/// Idempotent: `sanitize_name(&sanitize_name(s)) == sanitize_name(s)`.
pub fn sanitize_name(raw: &str) -> String {
    let stripped: String = raw.trim().chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    stripped.trim().to_string()
}

/// Path with the stem replaced, keeping the parent and final extension
pub fn replace_stem(path: &Path, new_stem: &str) -> PathBuf {
    let mut file_name = OsString::from(new_stem);
    if let Some(extension) = path.extension() {
        file_name.push(".");
        file_name.push(extension);
    }
    path.with_file_name(file_name)
}

fn is_usable_stem(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Ask the LLM for a new stem and rename one file.
///
/// Failures are logged here and returned with the offending path.
pub async fn rename_one(path: &Path, client: &dyn LLM) -> Result<RenamedFile, RenameError> {
    match try_rename_one(path, client).await {
        Ok(renamed) => Ok(renamed),
        Err(e) => {
            error!("Error while processing {}: {}", path.display(), e);
            Err(e)
        }
    }
}

async fn try_rename_one(path: &Path, client: &dyn LLM) -> Result<RenamedFile, RenameError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let prompt = build_rename_prompt(&stem);
    let answer = client.ask(&prompt).await.map_err(|source| RenameError::Llm {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("LLM answer for {}: {:?}", path.display(), answer);

    let new_stem = sanitize_name(&answer);
    if new_stem.is_empty() {
        return Err(RenameError::EmptyName {
            path: path.to_path_buf(),
        });
    }
    if !is_usable_stem(&new_stem) {
        return Err(RenameError::InvalidName {
            path: path.to_path_buf(),
            name: new_stem,
        });
    }

    let new_path = replace_stem(path, &new_stem);
    tokio::fs::rename(path, &new_path)
        .await
        .map_err(|source| RenameError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        "Renamed: {} -> {}",
        display_name(path),
        display_name(&new_path)
    );

    Ok(RenamedFile {
        from: path.to_path_buf(),
        to: new_path,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Every regular file under `directory`, at any depth.
///
/// Directories are never returned and symlinks are not followed. The list is
/// sorted by file name within each directory and fully collected before any
/// rename happens.
pub fn discover_files(directory: &Path) -> Result<Vec<PathBuf>, RenameError> {
    if !directory.is_dir() {
        return Err(RenameError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|source| RenameError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| directory.to_path_buf()),
            source,
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    debug!("Discovered {} files under {}", files.len(), directory.display());
    Ok(files)
}

/// Rename every file under `directory`, one after another.
///
/// With `stop_on_first_error` the first failure is returned and the rest of the
/// batch is skipped. Otherwise failures are collected in the summary.
pub async fn rename_all(
    directory: &Path,
    client: &dyn LLM,
    policy: &RenamePolicy,
) -> Result<BatchSummary, RenameError> {
    let files = discover_files(directory)?;
    info!("Found {} files under {}", files.len(), directory.display());

    let mut summary = BatchSummary::default();
    for path in files {
        match rename_one(&path, client).await {
            Ok(renamed) => summary.renamed.push(renamed),
            Err(e) if policy.stop_on_first_error => return Err(e),
            Err(e) => {
                warn!("Skipping {} and continuing", path.display());
                summary.failed.push(FailedFile {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_all_quotes() {
        assert_eq!(
            sanitize_name("  \"New \u{2018}Title\u{2019} Here\"  "),
            "New Title Here"
        );
        assert_eq!(sanitize_name("\u{201C}Quoted\u{201D}"), "Quoted");
        assert_eq!(sanitize_name("it's"), "its");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "   ",
            "plain",
            "\" spaced inside \"",
            "' \u{201C} '",
            "\u{2018}a\u{2019} \"b\"",
            "\n\tTitle\n",
        ];
        for sample in samples {
            let once = sanitize_name(sample);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_sanitize_only_quotes_is_empty() {
        assert_eq!(sanitize_name("\"\"''\u{201C}\u{201D}"), "");
    }

    #[test]
    fn test_replace_stem_keeps_suffix_and_parent() {
        let path = Path::new("/data/docs/report.txt");
        assert_eq!(
            replace_stem(path, "Quarterly Summary"),
            PathBuf::from("/data/docs/Quarterly Summary.txt")
        );
    }

    #[test]
    fn test_replace_stem_only_final_extension() {
        assert_eq!(
            replace_stem(Path::new("backup.tar.gz"), "archive"),
            PathBuf::from("archive.gz")
        );
        assert_eq!(replace_stem(Path::new("Makefile"), "Build"), PathBuf::from("Build"));
    }

    #[test]
    fn test_prompt_mentions_stem() {
        let prompt = build_rename_prompt("report");
        assert!(prompt.contains("\"report\""));
        assert!(prompt.contains("new title only"));
    }

    #[test]
    fn test_unusable_stems() {
        assert!(is_usable_stem("Good Name"));
        assert!(!is_usable_stem("a/b"));
        assert!(!is_usable_stem("a\\b"));
        assert!(!is_usable_stem(".."));
    }

    #[test]
    fn test_default_policy_stops() {
        assert!(RenamePolicy::default().stop_on_first_error);
        let policy = RenamePolicy::from(&RenameConfig {
            stop_on_first_error: false,
        });
        assert!(!policy.stop_on_first_error);
    }
}
