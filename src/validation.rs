use thiserror::Error;

pub const MAX_REMINDER_LENGTH: usize = 1000;
pub const MAX_DATE_INPUT_LENGTH: usize = 200;

const SUSPICIOUS_MARKERS: &[&str] = &["<script", "javascript:", "data:", "vbscript:"];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The input cannot be empty")]
    Empty,
    #[error("The input is too long (max {0} characters)")]
    TooLong(usize),
    #[error("The input contains invalid content")]
    SuspiciousContent,
}

/// Trims and drops control characters, keeping line breaks and tabs.
pub fn sanitize_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

pub fn validate_reminder_text(text: &str) -> Result<String, ValidationError> {
    validate(text, MAX_REMINDER_LENGTH)
}

pub fn validate_date_input(text: &str) -> Result<String, ValidationError> {
    validate(text, MAX_DATE_INPUT_LENGTH)
}

fn validate(text: &str, max_length: usize) -> Result<String, ValidationError> {
    let text = sanitize_text(text);
    if text.is_empty() {
        return Err(ValidationError::Empty);
    }
    if text.chars().count() > max_length {
        return Err(ValidationError::TooLong(max_length));
    }

    let lowered = text.to_lowercase();
    if SUSPICIOUS_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        let prefix: String = lowered.chars().take(50).collect();
        log::warn!("Blocked suspicious input. [prefix = {prefix:?}]");
        return Err(ValidationError::SuspiciousContent);
    }

    Ok(text)
}

/// Reduces a phrase to a plain data payload before it is handed to the
/// language model: word characters and common date punctuation only, single
/// spaces, bounded length.
pub fn sanitize_for_oracle(phrase: &str) -> String {
    let kept: String = sanitize_text(phrase)
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ",.:;/+-'?!()@".contains(*c))
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_DATE_INPUT_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_control_characters() {
        assert_eq!(sanitize_text("  next\u{0} friday\u{7} "), "next friday");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(validate_reminder_text("   "), Err(ValidationError::Empty));
    }

    #[test]
    fn oversized_input_is_rejected() {
        let text = "a".repeat(MAX_REMINDER_LENGTH + 1);
        assert_eq!(
            validate_reminder_text(&text),
            Err(ValidationError::TooLong(MAX_REMINDER_LENGTH))
        );
    }

    #[test]
    fn suspicious_markup_is_rejected() {
        assert_eq!(
            validate_reminder_text("<SCRIPT>alert(1)</script>"),
            Err(ValidationError::SuspiciousContent)
        );
        assert_eq!(
            validate_date_input("javascript:alert(1)"),
            Err(ValidationError::SuspiciousContent)
        );
    }

    #[test]
    fn ordinary_text_passes_through() {
        assert_eq!(
            validate_reminder_text("buy milk, call mum!"),
            Ok("buy milk, call mum!".to_string())
        );
    }

    #[test]
    fn oracle_sanitizer_collapses_whitespace_and_truncates() {
        assert_eq!(sanitize_for_oracle("in \n two   hours"), "in two hours");

        let long = "tomorrow ".repeat(60);
        assert_eq!(
            sanitize_for_oracle(&long).chars().count(),
            MAX_DATE_INPUT_LENGTH
        );
    }

    #[test]
    fn oracle_sanitizer_strips_markup_characters() {
        assert_eq!(
            sanitize_for_oracle("next friday {\"valid\": true} `sure`"),
            "next friday valid: true sure"
        );
    }
}
