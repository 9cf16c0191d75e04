use crate::utils::error::{InvoiceError, Result};

pub const MAX_FIELD_LENGTH: usize = 255;

/// Characters escaped with a backslash before a value reaches the renderer's argv.
pub const METACHARACTERS: &[char] = &[
    ';', '&', '|', '`', '\'', '\\', '*', '?', '~', '<', '>', '^', '#', '$', '@', '[', ']', '{',
    '}',
];

/// Trim, length-check and escape one free-text field. `None` passes through.
pub fn sanitize(input: Option<&str>) -> Result<Option<String>> {
    input.map(sanitize_str).transpose()
}

pub fn sanitize_str(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(InvoiceError::input_too_long());
    }

    let mut escaped = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Ok(escaped)
}

/// Like [`sanitize`], but an empty result counts as absent.
pub fn sanitize_non_empty(input: Option<&str>) -> Result<Option<String>> {
    Ok(sanitize(input)?.filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passes_through() {
        assert_eq!(sanitize(None).unwrap(), None);
    }

    #[test]
    fn test_plain_text_is_trimmed_only() {
        assert_eq!(
            sanitize(Some("  Acme Corp, 1 Main St.  ")).unwrap().as_deref(),
            Some("Acme Corp, 1 Main St.")
        );
    }

    #[test]
    fn test_semicolon_is_escaped() {
        assert_eq!(sanitize_str("a;b").unwrap(), "a\\;b");
    }

    #[test]
    fn test_every_metacharacter_is_escaped() {
        let input: String = METACHARACTERS.iter().collect();
        let output = sanitize_str(&input).unwrap();
        assert_eq!(output.len(), input.len() * 2);
        for (pair, original) in output.as_bytes().chunks(2).zip(input.chars()) {
            assert_eq!(pair[0], b'\\');
            assert_eq!(pair[1] as char, original);
        }
    }

    #[test]
    fn test_length_limit_applies_after_trim() {
        let exact = "a".repeat(MAX_FIELD_LENGTH);
        assert_eq!(sanitize_str(&format!("  {}  ", exact)).unwrap(), exact);

        let too_long = "a".repeat(MAX_FIELD_LENGTH + 1);
        let err = sanitize_str(&too_long).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("input too long"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_FIELD_LENGTH);
        assert!(sanitize_str(&accented).is_ok());
    }

    #[test]
    fn test_escaping_may_exceed_limit() {
        // 限制只檢查跳脫前的長度
        let input = "$".repeat(MAX_FIELD_LENGTH);
        assert_eq!(sanitize_str(&input).unwrap().len(), MAX_FIELD_LENGTH * 2);
    }

    #[test]
    fn test_sanitize_non_empty() {
        assert_eq!(sanitize_non_empty(Some("   ")).unwrap(), None);
        assert_eq!(sanitize_non_empty(Some(" x ")).unwrap().as_deref(), Some("x"));
    }
}
