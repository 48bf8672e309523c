//! Input normalization: one user submission in, one `IntakeRecord` out.

use super::types::{ImageBlob, IntakeRecord, TriageError};

/// Build the canonical intake record for a submission.
///
/// Trims and lower-cases the text, tokenizes it on non-alphanumeric
/// boundaries, and drops zero-byte attachments. Text-only, image-only and
/// mixed submissions are all valid; a submission with neither is rejected
/// with `EmptyInput`.
pub fn normalize(raw_text: &str, attachments: Vec<ImageBlob>) -> Result<IntakeRecord, TriageError> {
    let raw_text = raw_text.trim().to_string();
    let normalized_text = raw_text.to_lowercase();
    let tokens = tokenize(&normalized_text);

    let before = attachments.len();
    let attachments: Vec<ImageBlob> = attachments.into_iter().filter(|a| !a.is_empty()).collect();
    if attachments.len() < before {
        tracing::debug!(
            dropped = before - attachments.len(),
            "Dropped empty attachments during normalization"
        );
    }

    if raw_text.is_empty() && attachments.is_empty() {
        return Err(TriageError::EmptyInput);
    }

    Ok(IntakeRecord {
        raw_text,
        normalized_text,
        tokens,
        attachments,
    })
}

/// Split lower-cased text into word tokens. Hyphens and apostrophes are
/// treated as separators.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
