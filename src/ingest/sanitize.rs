//! # Text Sanitization
//!
//! Normalization applied to every review before it reaches a model:
//! ampersands become the word `and`, and control characters that break
//! downstream tokenizers are stripped. Tab, LF, and CR survive.
//!
//! The function is idempotent: stages can re-apply it to already-sanitized
//! text without drifting from what the splitter produced.

/// Control characters stripped from review text: C0 controls except
/// tab/LF/CR, DEL, and the C1 range.
fn is_stripped_control(c: char) -> bool {
    matches!(
        u32::from(c),
        0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F..=0x9F
    )
}

/// Normalize one review text.
pub fn sanitize_text(text: &str) -> String {
    text.replace('&', "and")
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ampersand_becomes_and() {
        assert_eq!(sanitize_text("fit & finish"), "fit and finish");
        assert_eq!(sanitize_text("Q&A"), "QandA");
    }

    #[test]
    fn test_control_characters_stripped() {
        assert_eq!(sanitize_text("bad\x00byte\x1fhere"), "badbytehere");
        assert_eq!(sanitize_text("del\x7fand c1\u{009f}"), "deland c1");
    }

    #[test]
    fn test_whitespace_controls_survive() {
        assert_eq!(sanitize_text("line one\nline two\ttabbed\r"), "line one\nline two\ttabbed\r");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize_text("perfectly ordinary review"), "perfectly ordinary review");
        assert_eq!(sanitize_text(""), "");
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(input in "\\PC*") {
            let once = sanitize_text(&input);
            prop_assert_eq!(sanitize_text(&once), once.clone());
        }

        #[test]
        fn prop_output_has_no_ampersands_or_stripped_controls(input in ".*") {
            let cleaned = sanitize_text(&input);
            prop_assert!(!cleaned.contains('&'));
            prop_assert!(cleaned.chars().all(|c| !is_stripped_control(c)));
        }
    }
}
