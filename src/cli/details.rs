use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Metadata report for a file, independent of any key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetails {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in kilobytes, rounded to two decimal places
    pub size_kb: f64,
}

/// Collect name, declared content type and size for `path`
pub fn file_details(path: &Path, content_type: Option<&str>) -> Result<FileDetails> {
    let size = fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(FileDetails {
        name: sanitize_filename(&name),
        content_type: content_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Unknown")
            .to_string(),
        size_kb: size_in_kb(size),
    })
}

/// Pretty JSON rendering of [`file_details`]
pub fn show_details(path: &Path, content_type: Option<&str>) -> Result<String> {
    let details = file_details(path, content_type)?;
    Ok(serde_json::to_string_pretty(&details)?)
}

fn size_in_kb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}

/// Reduce a file name to a safe flat ASCII form.
///
/// The name is NFKD-normalized and what is left outside ASCII is dropped.
/// Path separators become whitespace, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9._-]` is removed and leading or trailing `.` and `_`
/// are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let flattened: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
