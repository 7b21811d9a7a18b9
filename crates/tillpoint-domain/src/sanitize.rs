//! Input sanitization helpers
//!
//! These gate UI input flows, so they return values/booleans rather than
//! errors: a bad file type is a `false`, not an exception.

/// Strip redundant leading zeros from a numeric string, preserving sign and
/// any fraction part.
///
/// `"0007"` → `"7"`, `"0000"` → `"0"`, `"-007"` → `"-7"`, `"00.50"` → `"0.50"`.
/// Non-numeric input is returned unchanged; rejection is the validator's job.
pub fn sanitize_numeric(input: &str) -> String {
    let (sign, rest) = match input.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", input),
    };
    let (int_part, frac) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let trimmed = int_part.trim_start_matches('0');
    let int_part = if trimmed.is_empty() && !int_part.is_empty() {
        "0"
    } else if trimmed.is_empty() {
        int_part
    } else {
        trimmed
    };

    match frac {
        Some(f) => format!("{sign}{int_part}.{f}"),
        None => format!("{sign}{int_part}"),
    }
}

/// MIME types accepted for image attachments.
const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Whether a MIME type is an accepted image attachment type.
pub fn is_supported_image(mime: &str) -> bool {
    IMAGE_TYPES.contains(&mime.to_ascii_lowercase().as_str())
}
