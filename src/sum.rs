//! Integer coercion and summation.
//!
//! Both endpoints share this one routine. Input is a list of optional
//! strings; whatever parses as a base-10 integer is added up, everything
//! else is dropped on the floor.
//!
//! # Dropped tokens are not reported
//!
//! `null`, `"bad"`, `"2.5"`, `""` all contribute zero and the caller is never
//! told which tokens were skipped. Callers that need to know must validate
//! their input before sending it.
//!
//! # What counts as an integer
//!
//! An optional sign, then ASCII decimal digits that may be grouped by single
//! underscores. Whitespace around the token is ignored:
//!
//! | Token        | Value   |
//! |--------------|---------|
//! | `"42"`       | 42      |
//! | `"+5"`       | 5       |
//! | `"-5"`       | -5      |
//! | `" 7\n"`     | 7 (surrounding whitespace is trimmed) |
//! | `"1_000"`    | 1000 (single underscores between digits) |
//! | `"1__0"`, `"_1"`, `"1_"` | dropped |
//! | `"1 000"`    | dropped (interior whitespace) |
//! | `"2.5"`      | dropped |
//! | `"١٢"`       | dropped (non-ASCII digits are not decoded) |
//!
//! A token may be arbitrarily large on its way in: `"9223372036854775808"`
//! plus `"-1"` sums to `i64::MAX`. Only when a token or running total leaves
//! the `i128` range, or the final total leaves the `i64` range, does the sum
//! fail with [`SumError::Overflow`].

use thiserror::Error;

/// Failure of [`coerce_sum`].
///
/// Per-token parse failures never show up here.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SumError {
    #[error("sum does not fit in a 64-bit integer")]
    Overflow,
}

/// Parses one token.
///
/// `Ok(None)` means the token is not an integer and is to be skipped.
/// `Err` means it is an integer, but too large to add up.
pub fn coerce(token: &str) -> Result<Option<i128>, SumError> {
    let token = token.trim();
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if !is_digit_run(digits) {
        return Ok(None);
    }

    let mut value: i128 = 0;
    for d in digits.bytes().filter(u8::is_ascii_digit) {
        let d = i128::from(d - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(d) } else { v.checked_add(d) })
            .ok_or(SumError::Overflow)?;
    }
    Ok(Some(value))
}

// Digits, optionally grouped by single underscores: `1`, `1_000`, not `_1`, `1__0`, `1_`.
fn is_digit_run(s: &str) -> bool {
    let b = s.as_bytes();
    !b.is_empty()
        && b[0].is_ascii_digit()
        && b[b.len() - 1].is_ascii_digit()
        && b.iter().all(|c| c.is_ascii_digit() || *c == b'_')
        && !s.contains("__")
}

/// Sums every element of `tokens` that is present and parses as an integer.
///
/// Single pass, in order, into an `i128` accumulator; the result only has to
/// fit in an `i64` at the end.
///
/// ```
/// use summa::sum::coerce_sum;
///
/// let total = coerce_sum([Some("1"), Some("bad"), None, Some("3")]).unwrap();
/// assert_eq!(total, 4);
/// ```
pub fn coerce_sum<I, S>(tokens: I) -> Result<i64, SumError>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut total: i128 = 0;
    for token in tokens.into_iter().flatten() {
        if let Some(n) = coerce(token.as_ref())? {
            total = total.checked_add(n).ok_or(SumError::Overflow)?;
        }
    }

    i64::try_from(total).map_err(|_| SumError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sum_of(tokens: &[Option<&str>]) -> i64 {
        coerce_sum(tokens.iter().copied()).unwrap()
    }

    #[test]
    fn empty_input_sums_to_zero() {
        assert_eq!(sum_of(&[]), 0);
    }

    #[test]
    fn all_null_sums_to_zero() {
        assert_eq!(sum_of(&[None, None]), 0);
    }

    #[test]
    fn invalid_tokens_are_dropped() {
        assert_eq!(sum_of(&[Some("1"), Some("bad"), Some("3")]), 4);
        assert_eq!(sum_of(&[Some(""), Some("-"), Some("+"), Some("0x10"), Some("+-1")]), 0);
    }

    #[test]
    fn signed_tokens_are_accepted() {
        assert_eq!(sum_of(&[Some("-5"), Some("+5")]), 0);
        assert_eq!(sum_of(&[Some("-5"), Some("-6")]), -11);
        assert_eq!(sum_of(&[Some("-0"), Some("007")]), 7);
    }

    #[test]
    fn fractions_are_rejected() {
        assert_eq!(sum_of(&[Some("2.5")]), 0);
        assert_eq!(sum_of(&[Some("3.0"), Some("1e3")]), 0);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(sum_of(&[Some(" 7 ")]), 7);
        assert_eq!(sum_of(&[Some("\t-2\n")]), -2);
    }

    #[test]
    fn single_underscores_group_digits() {
        assert_eq!(sum_of(&[Some("1_000")]), 1000);
        assert_eq!(sum_of(&[Some("-1_0_0"), Some("+2_000")]), 1900);
    }

    #[test]
    fn misplaced_underscores_and_interior_whitespace_are_rejected() {
        let tokens = [Some("1__0"), Some("_1"), Some("1_"), Some("-_1"), Some("1 000"), Some("- 4")];
        assert_eq!(sum_of(&tokens), 0);
    }

    #[test]
    fn non_ascii_digits_are_dropped() {
        assert_eq!(sum_of(&[Some("\u{661}\u{662}"), Some("3")]), 3);
    }

    #[test]
    fn tokens_beyond_i64_still_count() {
        assert_eq!(sum_of(&[Some("9223372036854775808"), Some("-1")]), i64::MAX);
        assert_eq!(sum_of(&[Some("-9223372036854775809"), Some("1")]), i64::MIN);
    }

    #[test]
    fn intermediate_totals_may_exceed_i64() {
        let max = i64::MAX.to_string();
        assert_eq!(sum_of(&[Some(&max), Some("1"), Some("-1")]), i64::MAX);
    }

    #[test]
    fn final_total_out_of_range_is_an_error() {
        let max = i64::MAX.to_string();
        assert_eq!(coerce_sum([Some(max.as_str()), Some("1")]), Err(SumError::Overflow));
        assert_eq!(coerce_sum([Some("99999999999999999999")]), Err(SumError::Overflow));
    }

    #[test]
    fn token_beyond_i128_is_an_error() {
        let huge = format!("{}0", i128::MAX);
        assert_eq!(coerce(&huge), Err(SumError::Overflow));
        assert_eq!(coerce_sum([Some(huge.as_str()), Some("-1")]), Err(SumError::Overflow));
    }

    #[test]
    fn i128_extremes_parse_exactly() {
        assert_eq!(coerce(&i128::MAX.to_string()), Ok(Some(i128::MAX)));
        assert_eq!(coerce(&i128::MIN.to_string()), Ok(Some(i128::MIN)));
    }

    #[test]
    fn owned_strings_are_accepted() {
        let tokens = vec![Some("10".to_owned()), None, Some("x".to_owned()), Some("20".to_owned())];
        assert_eq!(coerce_sum(tokens).unwrap(), 30);
    }

    proptest! {
        #[test]
        fn matches_arithmetic_sum(values in prop::collection::vec(any::<i64>(), 0..64)) {
            let tokens: Vec<Option<String>> = values.iter().map(|v| Some(v.to_string())).collect();
            let expected: i128 = values.iter().copied().map(i128::from).sum();
            let got = coerce_sum(tokens);
            match i64::try_from(expected) {
                Ok(expected) => prop_assert_eq!(got, Ok(expected)),
                Err(_) => prop_assert_eq!(got, Err(SumError::Overflow)),
            }
        }

        #[test]
        fn underscore_grouping_does_not_change_value(value in any::<u32>()) {
            let grouped: String = value
                .to_string()
                .chars()
                .flat_map(|c| [c, '_'])
                .collect::<String>();
            let grouped = grouped.trim_end_matches('_');
            prop_assert_eq!(coerce(grouped), Ok(Some(i128::from(value))));
        }

        #[test]
        fn repeated_calls_agree(tokens in prop::collection::vec(prop::option::of("[-+ _0-9a-z.]{0,6}"), 0..32)) {
            let first = coerce_sum(tokens.iter().map(|t| t.as_deref()));
            let second = coerce_sum(tokens.iter().map(|t| t.as_deref()));
            prop_assert_eq!(first, second);
        }
    }
}
