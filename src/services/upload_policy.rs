//! src/services/upload_policy.rs
//!
//! Pre-storage checks for untrusted uploads: metadata validation and
//! filename sanitisation. Both are pure functions over the request
//! metadata; file content is never inspected.

use thiserror::Error;

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 104_857_600;

/// Extensions refused outright. This is a denylist: anything not listed,
/// including extension-less names, passes.
const DENIED_EXTENSIONS: [&str; 6] = [".exe", ".bat", ".cmd", ".sh", ".com", ".scr"];

/// Upper bound on a sanitised filename.
const MAX_FILENAME_LEN: usize = 100;

/// Stand-in when sanitisation filters the entire name away.
const FALLBACK_FILENAME: &str = "unnamed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File is empty")]
    EmptyFile,
    #[error("File too large. Max size: {max_mib}MB")]
    TooLarge { max_mib: u64 },
    #[error("File type not allowed for security reasons")]
    DisallowedType,
}

/// Check an upload's declared metadata against the configured limits.
pub fn validate(filename: &str, size: u64, max_size: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > max_size {
        return Err(ValidationError::TooLarge {
            max_mib: max_size / 1024 / 1024,
        });
    }

    let lowered = filename.to_lowercase();
    if DENIED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
        return Err(ValidationError::DisallowedType);
    }

    Ok(())
}

/// Reduce an arbitrary client-supplied filename to a path-safe identifier:
/// literal `..` sequences are stripped before filtering, every character
/// outside `[A-Za-z0-9._-]` becomes `_`, runs of `_` collapse to one, and
/// the result is capped at 100 characters. A name that filters away
/// entirely falls back to `unnamed` so the output is never empty.
pub fn sanitize_filename(raw: &str) -> String {
    let stripped = raw.replace("..", "");

    let mut out = String::with_capacity(stripped.len().min(MAX_FILENAME_LEN));
    let mut last_was_underscore = false;
    for c in stripped.chars() {
        if out.len() == MAX_FILENAME_LEN {
            break;
        }
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        // Only ASCII reaches here, so byte length equals char count.
        out.push(mapped);
    }

    if out.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    out
}
