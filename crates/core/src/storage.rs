//! Object-store path layout and signed URL helpers.
//!
//! The core never holds blob bytes beyond an upload call; dispositions store
//! only the path and URL returned by the object store.

use crate::error::CoreError;
use crate::hashing::hmac_sha256_hex;
use crate::types::DbId;

/// Maximum accepted report size (25 MiB).
pub const MAX_REPORT_BYTES: usize = 25 * 1024 * 1024;

/// Maximum length of a sanitized file name.
const MAX_FILE_NAME_LEN: usize = 120;

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and strip leading dots.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_FILE_NAME_LEN).collect();
    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

/// Object-store path for a report uploaded to a disposition.
///
/// `unique` keeps two uploads with the same name apart.
pub fn report_path(disposition_id: DbId, unique: DbId, file_name: &str) -> String {
    format!(
        "dispositions/{disposition_id}/reports/{unique}-{}",
        sanitize_file_name(file_name)
    )
}

/// Reject empty or oversized uploads.
pub fn validate_upload(file_name: &str, bytes: &[u8]) -> Result<(), CoreError> {
    if file_name.trim().is_empty() {
        return Err(CoreError::Validation("File name must not be empty".into()));
    }
    if bytes.is_empty() {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if bytes.len() > MAX_REPORT_BYTES {
        return Err(CoreError::Validation(format!(
            "File exceeds the maximum size of {} MiB",
            MAX_REPORT_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Reject paths that could escape the store root.
pub fn validate_storage_path(path: &str) -> Result<(), CoreError> {
    if path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(CoreError::Validation(format!("Invalid storage path '{path}'")));
    }
    Ok(())
}

/// Signature over `path` and its expiry (Unix seconds).
pub fn sign_path(secret: &[u8], path: &str, expires_at: i64) -> String {
    hmac_sha256_hex(secret, format!("{path}\n{expires_at}").as_bytes())
}

/// Build a signed URL of the form `{base}/{path}?expires=..&signature=..`.
pub fn signed_url(base_url: &str, secret: &[u8], path: &str, expires_at: i64) -> String {
    let signature = sign_path(secret, path, expires_at);
    format!(
        "{}/{path}?expires={expires_at}&signature={signature}",
        base_url.trim_end_matches('/')
    )
}

/// Check a signature produced by [`sign_path`] and that it has not expired.
pub fn verify_signature(
    secret: &[u8],
    path: &str,
    expires_at: i64,
    signature: &str,
    now_unix: i64,
) -> bool {
    if now_unix > expires_at {
        return false;
    }
    let expected = sign_path(secret, path, expires_at);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
