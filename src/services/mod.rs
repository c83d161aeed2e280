//! Business rules. Handlers parse the request and hand over to these functions, which do the
//! authorisation checks and state transitions and talk to the `Repository`/`StorageService`.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::UploadRequest,
};

pub mod analytics;
pub mod auth;
pub mod certificates;
pub mod content;
pub mod courses;
pub mod enrollments;
pub mod progress;
pub mod sections;
pub mod users;
pub mod videos;

pub const MIB: i64 = 1024 * 1024;

/// validate_upload
///
/// Common checks for client uploads: non-empty, MIME type under `type_prefix`
/// (e.g. `image/`), at most `max_bytes`.
pub fn validate_upload(request: &UploadRequest, type_prefix: &str, max_bytes: i64) -> AppResult<()> {
    if request.file_size <= 0 || request.file_name.trim().is_empty() {
        return Err(AppError::bad_request("FILE_EMPTY", "File is empty"));
    }
    if !request.content_type.to_ascii_lowercase().starts_with(type_prefix) {
        return Err(AppError::bad_request(
            "INVALID_FILE_TYPE",
            format!("Only {}* files are allowed", type_prefix),
        ));
    }
    if request.file_size > max_bytes {
        return Err(AppError::bad_request(
            "FILE_TOO_LARGE",
            format!("File size must not exceed {} MB", max_bytes / MIB),
        ));
    }
    Ok(())
}

/// Extension of `file_name` without the dot, lower-cased. Falls back to `fallback`.
pub fn file_extension(file_name: &str, fallback: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}

/// Reduces a client file name to `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}

pub fn millis(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis()
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whole percentage of `part` in `total`, two decimals, 0 when `total` is 0.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// Treats missing and whitespace-only strings alike.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, size: i64) -> UploadRequest {
        UploadRequest {
            file_name: name.into(),
            content_type: content_type.into(),
            file_size: size,
        }
    }

    #[test]
    fn upload_validation_codes() {
        let empty = validate_upload(&upload("a.png", "image/png", 0), "image/", MIB);
        assert_eq!(empty.unwrap_err().code(), "FILE_EMPTY");

        let wrong = validate_upload(&upload("a.pdf", "application/pdf", 10), "image/", MIB);
        assert_eq!(wrong.unwrap_err().code(), "INVALID_FILE_TYPE");

        let big = validate_upload(&upload("a.png", "image/png", MIB + 1), "image/", MIB);
        assert_eq!(big.unwrap_err().code(), "FILE_TOO_LARGE");

        assert!(validate_upload(&upload("a.png", "image/png", MIB), "image/", MIB).is_ok());
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my video (1).mp4"), "my_video__1_.mp4");
        assert_eq!(file_extension("photo.JPG", "bin"), "jpg");
        assert_eq!(file_extension("noext", "bin"), "bin");
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
