//! Stable string hashing for fixture naming.

/// Hash a string the way `String.hashCode` does on the JVM (and in most JS
/// test helpers): `h = 31 * h + unit` over UTF-16 code units with 32-bit
/// wrap-around, then the absolute value.
///
/// Useful for deriving stable, short names (ports, temp dirs, user ids) from a
/// test's full name. The empty string hashes to `0`.
pub fn hash_code(s: &str) -> u32 {
    let hash = s
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    hash.unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(hash_code(""), 0);
    }

    #[test]
    fn matches_known_jvm_values() {
        // "hello".hashCode() == 99162322
        assert_eq!(hash_code("hello"), 99_162_322);
        // "a".hashCode() == 97
        assert_eq!(hash_code("a"), 97);
        // "polygenelubricants".hashCode() == i32::MIN, whose absolute value does not fit in i32
        assert_eq!(hash_code("polygenelubricants"), 2_147_483_648);
    }

    #[test]
    fn counts_utf16_units_not_bytes() {
        // U+00E9 is one UTF-16 unit (0xE9 = 233) but two UTF-8 bytes.
        assert_eq!(hash_code("\u{e9}"), 233);
    }

    proptest! {
        #[test]
        fn hash_is_deterministic(s in ".*") {
            prop_assert_eq!(hash_code(&s), hash_code(&s));
        }
    }
}
