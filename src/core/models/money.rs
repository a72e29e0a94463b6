//! Conversion between display strings and integer minor units.
//!
//! Everything inside the crate is `i64` minor units (cents). Decimal strings
//! only exist at the boundary, so these two functions are the only place
//! that knows about the decimal point.

use crate::core::errors::LedgerError;

/// Minor units per major unit. Two decimal places for every supported currency.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Parses a decimal amount such as `"12.34"`, `"-0.5"` or `"7"` into minor units.
pub fn parse_major(input: &str) -> Result<i64, LedgerError> {
    let invalid = |description: String| LedgerError::invalid_input("amount", "Invalid Amount", description);

    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(format!("`{}` is not a number", input)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!("`{}` is not a number", input)));
    }
    if fraction.len() > 2 {
        return Err(invalid("Amount cannot have more than 2 decimal places".to_string()));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| invalid(format!("`{}` is out of range", input)))?
    };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().unwrap_or(0) * 10,
        _ => fraction.parse::<i64>().unwrap_or(0),
    };

    let minor = whole
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid(format!("`{}` is out of range", input)))?;
    Ok(if negative { -minor } else { minor })
}

/// Formats minor units as a plain decimal string, e.g. `-1234` -> `"-12.34"`.
pub fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let per = MINOR_PER_MAJOR as u64;
    format!("{}{}.{:02}", sign, abs / per, abs % per)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_major("100.00").unwrap(), 10_000);
        assert_eq!(parse_major("12.3").unwrap(), 1_230);
        assert_eq!(parse_major("7").unwrap(), 700);
        assert_eq!(parse_major("-0.05").unwrap(), -5);
        assert_eq!(parse_major(".5").unwrap(), 50);
    }

    #[test]
    fn rejects_garbage_and_extra_precision() {
        assert!(parse_major("").is_err());
        assert!(parse_major("abc").is_err());
        assert!(parse_major("1.234").is_err());
        assert!(parse_major("1,00").is_err());
        assert!(parse_major("99999999999999999999").is_err());
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(format_minor(5_000), "50.00");
        assert_eq!(format_minor(-1_234), "-12.34");
        assert_eq!(format_minor(7), "0.07");
        assert_eq!(format_minor(i64::MIN), "-92233720368547758.08");
    }
}
