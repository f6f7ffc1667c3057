//! Locale-tolerant price parsing.
//!
//! Marketplaces format prices for humans: `12,50 €`, `$1,234.56`,
//! `EUR 1.234,56`, sometimes with mangled encodings of the euro sign.
//! [`parse_price`] strips everything except digits and the two separator
//! characters, then decides which separator is the decimal mark:
//!
//! - both `,` and `.` present: the rightmost one is the decimal mark
//! - only one kind present: its rightmost occurrence is the decimal mark
//! - no digits at all: `None`
//!
//! The function is pure and total. Callers must treat `None` as
//! "exclude from min/avg computations", never as zero.

/// Parse a human-formatted price string into a number.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let decimal_at = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => Some(comma.max(dot)),
        (Some(comma), None) => Some(comma),
        (None, Some(dot)) => Some(dot),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(cleaned.len());
    for (idx, ch) in cleaned.char_indices() {
        if ch.is_ascii_digit() {
            normalized.push(ch);
        } else if Some(idx) == decimal_at {
            normalized.push('.');
        }
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_decimal_with_euro_sign() {
        assert_eq!(parse_price("12,50 €"), Some(12.5));
    }

    #[test]
    fn test_dot_decimal_with_dollar_sign() {
        assert_eq!(parse_price("$12.50"), Some(12.5));
    }

    #[test]
    fn test_rightmost_separator_wins() {
        assert_eq!(parse_price("1.234,56 €"), Some(1234.56));
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
    }

    #[test]
    fn test_mangled_euro_sign() {
        assert_eq!(parse_price("45,00 â‚¬"), Some(45.0));
    }

    #[test]
    fn test_integer_price() {
        assert_eq!(parse_price("EUR 80"), Some(80.0));
    }

    #[test]
    fn test_thin_space_grouping() {
        assert_eq!(parse_price("1 299,99 €"), Some(1299.99));
    }

    #[test]
    fn test_no_digits_returns_none() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Free"), None);
        assert_eq!(parse_price("€"), None);
        assert_eq!(parse_price(",."), None);
    }

    #[test]
    fn test_never_nan() {
        for input in ["", ".", "..", ",", "abc", "€,€", "NaN", "inf"] {
            let parsed = parse_price(input);
            assert!(parsed.is_none_or(|v| v.is_finite()), "input {input:?} gave {parsed:?}");
        }
    }

    #[test]
    fn test_single_run_either_mark() {
        let cases = [("0,99", 0.99), ("0.99", 0.99), ("250,5", 250.5), ("250.5", 250.5), ("7", 7.0)];
        for (input, expected) in cases {
            assert_eq!(parse_price(input), Some(expected), "input {input:?}");
        }
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(parse_price("15,- €"), Some(15.0));
    }
}
