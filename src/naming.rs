//! Download destination naming
//!
//! A URL does not always reveal what it serves. The file name for a
//! download, and whether it must be unzipped, is derived from up to three
//! sources, in order:
//! 1. The URL basename, when it carries a zip extension
//! 2. The `Content-Type` header, when it names a zip MIME type
//! 3. The `Content-Disposition` attachment filename
//!
//! When none of them produce a name, the URL basename is reused with its
//! extension coerced into the supported set.

use crate::extensions::{extension_of, SupportedExtensions};
use crate::transport::RemoteMetadata;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

/// Extensions treated as zip archives
pub const ZIP_EXTS: &[&str] = &[".zip"];

/// MIME types treated as zip archives
pub const ZIP_MIME_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "multipart/x-zip",
];

/// Base name used when nothing better is known
pub const DEFAULT_BASENAME: &str = "app";

/// Replacement for characters that cannot appear in file names
pub const SANITIZE_REPLACEMENT: char = '_';

const ILLEGAL_CHARS: &[char] = &['/', '\\', '?', '<', '>', ':', '*', '|', '"'];

/// The chosen name for a download and whether it is an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadName {
    pub file_name: String,
    pub is_archive: bool,
}

/// Whether a path carries a zip extension
pub fn is_zip_path(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| ZIP_EXTS.contains(&ext.as_str()))
}

/// Derive the download name from the URL and the probed headers
pub fn derive_download_name(
    url: &Url,
    meta: &RemoteMetadata,
    extensions: &SupportedExtensions,
) -> DownloadName {
    let basename = sanitize_file_name(&url_basename(url), SANITIZE_REPLACEMENT);
    let basename = (!basename.is_empty()).then_some(basename);

    let mut file_name: Option<String> = None;
    let mut is_archive = false;

    if let Some(name) = basename.as_deref() {
        if is_zip_path(Path::new(name)) {
            file_name = Some(name.to_string());
            is_archive = true;
        }
    }

    if let Some(content_type) = meta.content_type.as_deref() {
        debug!("Content-Type: {}", content_type);
        if is_zip_mime(content_type) {
            if file_name.is_none() {
                file_name = Some(format!("{}.zip", DEFAULT_BASENAME));
            }
            is_archive = true;
        }
    }

    if let Some(disposition) = meta.content_disposition.as_deref() {
        if let Some(attachment) = attachment_file_name(disposition) {
            debug!("Content-Disposition: {}", disposition);
            let name = sanitize_file_name(&attachment, SANITIZE_REPLACEMENT);
            is_archive = is_archive || is_zip_path(Path::new(&name));
            file_name = Some(name);
        }
    }

    let file_name = match file_name {
        Some(name) => name,
        None => fallback_name(basename.as_deref(), extensions),
    };

    DownloadName {
        file_name,
        is_archive,
    }
}

fn fallback_name(basename: Option<&str>, extensions: &SupportedExtensions) -> String {
    let (stem, ext) = match basename {
        Some(name) => {
            let path = Path::new(name);
            let ext = extension_of(path).unwrap_or_default();
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty() && !ext.is_empty())
                .unwrap_or(name);
            (stem.to_string(), ext)
        }
        None => (DEFAULT_BASENAME.to_string(), String::new()),
    };

    let ext = if extensions.contains(&ext) {
        ext
    } else {
        let fallback = extensions.default_ext().to_string();
        info!(
            "The current file extension '{}' is not supported. Defaulting to '{}'",
            ext, fallback
        );
        fallback
    };
    format!("{}{}", stem, ext)
}

/// Last path segment of the URL, percent-decoded
fn url_basename(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Match a zip MIME type as a whole word inside a header value
fn is_zip_mime(content_type: &str) -> bool {
    static ZIP_MIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        let alternatives: Vec<String> = ZIP_MIME_TYPES.iter().map(|m| regex::escape(m)).collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
            .expect("Invalid regex")
    });

    ZIP_MIME_REGEX.is_match(content_type)
}

/// Extract `filename="..."` from an attachment disposition
fn attachment_file_name(disposition: &str) -> Option<String> {
    let lower = disposition.to_ascii_lowercase();
    if !lower.trim_start().starts_with("attachment") {
        return None;
    }

    let marker = "filename=\"";
    let start = lower.find(marker)? + marker.len();
    let rest = &disposition[start..];
    let name: String = rest.chars().take_while(|c| *c != '"').collect();
    (!name.is_empty()).then_some(name)
}

/// Map arbitrary text to a file-system safe name.
///
/// Each illegal or control character is replaced with `replacement`.
/// Names consisting only of dots become a single replacement.
pub fn sanitize_file_name(name: &str, replacement: char) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                replacement
            } else {
                c
            }
        })
        .collect();

    if !cleaned.is_empty() && cleaned.chars().all(|c| c == '.') {
        return replacement.to_string();
    }
    cleaned.trim_end_matches([' ', '.']).to_string()
}
