//! Supported bundle extensions
//!
//! Callers may describe the accepted extensions as a single value or an
//! ordered list. Both forms are normalized once into [`SupportedExtensions`];
//! the first element doubles as the fallback extension for downloads whose
//! name carries no usable extension.

use crate::error::{AppfetchError, AppfetchResult};
use std::fmt;
use std::path::Path;

/// Ordered, non-empty set of accepted bundle extensions (e.g. `.apk`, `.app`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedExtensions(Vec<String>);

impl SupportedExtensions {
    /// Build the set from any sequence of extensions.
    ///
    /// Each extension is normalized to lowercase with a leading dot.
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn try_new<I, S>(extensions: I) -> AppfetchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = normalize(ext.as_ref());
            if ext.len() > 1 && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        if normalized.is_empty() {
            return Err(AppfetchError::NoExtensions);
        }
        Ok(Self(normalized))
    }

    /// The fallback extension used when a download has none of its own
    pub fn default_ext(&self) -> &str {
        &self.0[0]
    }

    /// Iterate the extensions in caller order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether `ext` (with or without leading dot) belongs to the set
    pub fn contains(&self, ext: &str) -> bool {
        let ext = normalize(ext);
        self.iter().any(|e| e == ext)
    }

    /// Whether the path's extension belongs to the set
    pub fn matches(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.contains(&ext))
    }

    /// Confirm the resolved artifact carries a supported extension
    pub fn verify<'a>(&self, path: &'a Path) -> AppfetchResult<&'a Path> {
        if self.matches(path) {
            return Ok(path);
        }
        Err(AppfetchError::UnsupportedExtension {
            path: path.to_path_buf(),
            supported: self.to_string(),
        })
    }
}

impl fmt::Display for SupportedExtensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.iter().map(|e| format!("'{}'", e)).collect();
        write!(f, "{}", quoted.join(", "))
    }
}

impl TryFrom<&str> for SupportedExtensions {
    type Error = AppfetchError;

    fn try_from(ext: &str) -> AppfetchResult<Self> {
        Self::try_new([ext])
    }
}

impl TryFrom<String> for SupportedExtensions {
    type Error = AppfetchError;

    fn try_from(ext: String) -> AppfetchResult<Self> {
        Self::try_new([ext])
    }
}

impl TryFrom<Vec<String>> for SupportedExtensions {
    type Error = AppfetchError;

    fn try_from(extensions: Vec<String>) -> AppfetchResult<Self> {
        Self::try_new(extensions)
    }
}

impl TryFrom<&[&str]> for SupportedExtensions {
    type Error = AppfetchError;

    fn try_from(extensions: &[&str]) -> AppfetchResult<Self> {
        Self::try_new(extensions)
    }
}

/// Lowercased extension of a path including the leading dot
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

fn normalize(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
