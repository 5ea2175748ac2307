//! File naming for uploads and downloads.

use std::sync::OnceLock;

use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use url::Url;

pub const UPLOAD_ID_LEN: usize = 21;
pub const DOWNLOAD_ID_LEN: usize = 8;
const DEFAULT_UPLOAD_EXTENSION: &str = "jpg";
const DEFAULT_DOWNLOAD_EXTENSION: &str = "png";

/// Random string over `[A-Za-z0-9]`. Uniqueness is probabilistic only.
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Text after the last `.` of `file_name`, or `jpg` when there is none.
pub fn upload_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => DEFAULT_UPLOAD_EXTENSION,
    }
}

pub fn upload_file_name(original: &str) -> String {
    format!("{}.{}", random_id(UPLOAD_ID_LEN), upload_extension(original))
}

fn media_extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\.(jpe?g|png|webp|mp4|webm)").expect("static media extension regex")
    })
}

/// Extension for a downloaded result: content type first, then the URL, then `png`.
pub fn download_extension(url: &str, content_type: Option<&str>) -> String {
    if let Some(content_type) = content_type {
        let content_type = content_type.to_ascii_lowercase();
        let by_type = [
            ("jpeg", "jpg"),
            ("jpg", "jpg"),
            ("png", "png"),
            ("webp", "webp"),
            ("mp4", "mp4"),
            ("webm", "webm"),
        ]
        .into_iter()
        .find(|(needle, _)| content_type.contains(needle));
        if let Some((_, ext)) = by_type {
            return ext.to_string();
        }
    }

    media_extension_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase().replace("jpeg", "jpg"))
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_EXTENSION.to_string())
}

pub fn download_file_name(extension: &str) -> String {
    format!("result_{}.{extension}", random_id(DOWNLOAD_ID_LEN))
}

/// Appends `t=<millis>` to `url`, keeping any existing query.
pub fn cache_busted(url: &str) -> String {
    let stamp = chrono::Utc::now().timestamp_millis().to_string();
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair("t", &stamp);
            parsed.into()
        }
        Err(_) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}t={stamp}")
        }
    }
}

#[cfg(test)]
#[path = "tests/naming_tests.rs"]
mod tests;
