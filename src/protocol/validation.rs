use thiserror::Error;

/// Why a message body was refused before it reached storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextRejection {
    #[error("Message text cannot be empty")]
    Empty,
    #[error("Message too long ({length} characters, max {max})")]
    TooLong { length: usize, max: usize },
}

/// Trim a message body and check it against the configured length limit.
/// Returns the trimmed text that should be stored.
pub fn validate_message_text(text: &str, max_chars: usize) -> Result<&str, TextRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TextRejection::Empty);
    }

    let length = trimmed.chars().count();
    if length > max_chars {
        return Err(TextRejection::TooLong {
            length,
            max: max_chars,
        });
    }

    Ok(trimmed)
}
