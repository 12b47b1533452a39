//! Display masking for sensitive record fields
//!
//! Lengths are counted in characters, not bytes, so names and addresses in
//! non-Latin scripts mask cleanly.

/// Shown in place of an absent value
pub const PLACEHOLDER: &str = "N/A";

/// Redaction character
pub const REDACTION: char = '*';

/// Separator between the revealed initial and the redacted rest of a name
pub const NAME_SEPARATOR: char = '.';

/// Redact all but the last `keep_last` characters of `value`.
///
/// Values no longer than `keep_last` are redacted completely.
pub fn mask_tail(value: Option<&str>, keep_last: usize) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return PLACEHOLDER.to_string(),
    };

    let len = value.chars().count();
    if len <= keep_last {
        return std::iter::repeat(REDACTION).take(len).collect();
    }

    let hidden = len - keep_last;
    std::iter::repeat(REDACTION)
        .take(hidden)
        .chain(value.chars().skip(hidden))
        .collect()
}

/// Reveal only the upper-cased initial of a name.
pub fn mask_name(value: Option<&str>) -> String {
    let mut chars = match value {
        Some(v) if !v.is_empty() => v.chars(),
        _ => return PLACEHOLDER.to_string(),
    };

    // Non-empty, so there is a first char
    let first = chars.next().unwrap_or(REDACTION);
    let rest = chars.count();

    let mut out: String = first.to_uppercase().collect();
    out.push(NAME_SEPARATOR);
    out.extend(std::iter::repeat(REDACTION).take(rest));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_tail_keeps_suffix() {
        assert_eq!(mask_tail(Some("116440054586"), 4), "********4586");
    }

    #[test]
    fn test_mask_tail_short_value_fully_redacted() {
        assert_eq!(mask_tail(Some("1234"), 4), "****");
        assert_eq!(mask_tail(Some("12"), 4), "**");
    }

    #[test]
    fn test_mask_tail_absent_or_empty() {
        assert_eq!(mask_tail(None, 4), PLACEHOLDER);
        assert_eq!(mask_tail(Some(""), 4), PLACEHOLDER);
    }

    #[test]
    fn test_mask_tail_zero_keep() {
        assert_eq!(mask_tail(Some("secret"), 0), "******");
    }

    #[test]
    fn test_mask_tail_preserves_length_for_multibyte() {
        let value = "गाँव रामपुर 221001";
        let masked = mask_tail(Some(value), 6);
        assert_eq!(masked.chars().count(), value.chars().count());
        assert!(masked.ends_with("221001"));
        assert!(masked.starts_with('*'));
    }

    #[test]
    fn test_mask_tail_length_property() {
        for value in ["a", "ab", "abcdef", "1234567890123", "x y z"] {
            for keep in 0..8 {
                let masked = mask_tail(Some(value), keep);
                let len = value.chars().count();
                assert_eq!(masked.chars().count(), len);

                if len > keep {
                    let tail: String = value.chars().skip(len - keep).collect();
                    assert!(masked.ends_with(&tail));
                    assert!(masked.chars().take(len - keep).all(|c| c == REDACTION));
                } else {
                    assert!(masked.chars().all(|c| c == REDACTION));
                }
            }
        }
    }

    #[test]
    fn test_mask_name_reveals_initial_only() {
        assert_eq!(mask_name(Some("ramesh")), "R.*****");
        assert_eq!(mask_name(Some("A")), "A.");
    }

    #[test]
    fn test_mask_name_absent() {
        assert_eq!(mask_name(None), PLACEHOLDER);
        assert_eq!(mask_name(Some("")), PLACEHOLDER);
    }

    #[test]
    fn test_mask_name_hides_other_characters() {
        let name = "sunita devi";
        let masked = mask_name(Some(name));
        assert!(masked.starts_with('S'));
        for c in name.chars().skip(1).filter(|c| *c != ' ') {
            assert!(!masked[1..].contains(c), "leaked {:?}", c);
        }
    }
}
