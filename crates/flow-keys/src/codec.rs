//! Component encodings.
//!
//! Numbers are written as exactly [`NUMERIC_WIDTH`] ASCII digits. `u64`
//! ids are zero-padded. `i64` timestamps are first mapped onto `u64` by
//! flipping the sign bit (`i64::MIN` becomes 0, `-1` becomes `2^63 - 1`,
//! `0` becomes `2^63`), which preserves order, then zero-padded.
//!
//! Text is percent-escaped: `%` as `%25`, `/` as `%2F`, `@` as `%40`.
//! Escaping `%` first keeps the mapping injective.

use std::borrow::Cow;

use crate::error::{KeyError, KeyResult};

/// Digits in every numeric key component. `u64::MAX` has 20 digits.
pub const NUMERIC_WIDTH: usize = 20;

const SIGN_BIT: u64 = 1 << 63;

pub fn encode_id(id: u64) -> String {
    format!("{id:020}")
}

pub fn encode_timestamp(ts: i64) -> String {
    encode_id((ts as u64) ^ SIGN_BIT)
}

pub fn decode_id(component: &[u8]) -> KeyResult<u64> {
    if component.len() != NUMERIC_WIDTH || !component.iter().all(u8::is_ascii_digit) {
        return Err(KeyError::malformed(
            component,
            format!("expected {NUMERIC_WIDTH} decimal digits"),
        ));
    }
    // All digits, so the only failure left is overflow past u64::MAX.
    std::str::from_utf8(component)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| KeyError::malformed(component, "numeric component out of range"))
}

pub fn decode_timestamp(component: &[u8]) -> KeyResult<i64> {
    decode_id(component).map(|v| (v ^ SIGN_BIT) as i64)
}

/// Escape a text component so it contains no raw delimiter.
pub fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains(['%', '/', '@']) {
        return Cow::Borrowed(component);
    }
    let mut out = String::with_capacity(component.len() + 8);
    for ch in component.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '@' => out.push_str("%40"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Reverse [`escape`]. Only the three escapes it produces are accepted.
pub fn unescape(component: &str) -> KeyResult<String> {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escaped = rest.get(pos..pos + 3).unwrap_or(&rest[pos..]);
        let ch = match escaped {
            "%25" => '%',
            "%2F" => '/',
            "%40" => '@',
            _ => {
                return Err(KeyError::malformed(
                    component.as_bytes(),
                    format!("invalid escape {escaped:?}"),
                ))
            }
        };
        out.push(ch);
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ids_are_fixed_width() {
        assert_eq!(encode_id(0), "00000000000000000000");
        assert_eq!(encode_id(42), "00000000000000000042");
        assert_eq!(encode_id(u64::MAX), "18446744073709551615");
        assert_eq!(encode_id(u64::MAX).len(), NUMERIC_WIDTH);
    }

    #[test]
    fn nine_sorts_before_ten() {
        assert!(encode_id(9) < encode_id(10));
        assert!(encode_timestamp(9) < encode_timestamp(10));
    }

    #[test]
    fn timestamp_sign_mapping() {
        assert_eq!(encode_timestamp(i64::MIN), encode_id(0));
        assert_eq!(encode_timestamp(0), encode_id(1 << 63));
        assert!(encode_timestamp(-1) < encode_timestamp(0));
        assert!(encode_timestamp(i64::MAX) > encode_timestamp(0));
    }

    #[test]
    fn decode_round_trips_boundaries() {
        for ts in [i64::MIN, -1, 0, 1, 1_700_000_000_000, i64::MAX] {
            assert_eq!(decode_timestamp(encode_timestamp(ts).as_bytes()).unwrap(), ts);
        }
        for id in [0, 1, 999, u64::MAX] {
            assert_eq!(decode_id(encode_id(id).as_bytes()).unwrap(), id);
        }
    }

    #[test]
    fn decode_rejects_bad_components() {
        assert!(decode_id(b"42").is_err());
        assert!(decode_id(b"0000000000000000004x").is_err());
        assert!(decode_id(b"99999999999999999999").is_err());
        assert!(decode_id(b"").is_err());
    }

    #[test]
    fn escape_leaves_plain_text_borrowed() {
        assert!(matches!(escape("plain-text_1"), Cow::Borrowed(_)));
    }

    #[test]
    fn escape_removes_delimiters() {
        assert_eq!(escape("a/b"), "a%2Fb");
        assert_eq!(escape("x@y"), "x%40y");
        assert_eq!(escape("100%"), "100%25");
        assert_eq!(escape("%2F"), "%252F");
    }

    #[test]
    fn unescape_rejects_unknown_sequences() {
        assert!(unescape("%zz").is_err());
        assert!(unescape("trailing%").is_err());
        assert!(unescape("%2").is_err());
    }

    proptest! {
        #[test]
        fn id_order_matches_byte_order(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(a.cmp(&b), encode_id(a).cmp(&encode_id(b)));
        }

        #[test]
        fn timestamp_order_matches_byte_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encode_timestamp(a).cmp(&encode_timestamp(b)));
        }

        #[test]
        fn escaped_text_has_no_delimiters(s in ".*") {
            let escaped = escape(&s);
            prop_assert!(!escaped.contains('/'));
            prop_assert!(!escaped.contains('@'));
            prop_assert_eq!(unescape(&escaped).unwrap(), s);
        }
    }
}
