//! Money arithmetic over price strings
//!
//! Prices are persisted as decimal strings (e.g. `"12.50"`). Arithmetic such
//! as bundle auto-pricing and order totals goes through integer cents to keep
//! sums exact.

/// Parse a price string into integer cents.
///
/// Accepts an optional leading minus, an integer part, and up to two fraction
/// digits. Returns `None` for anything else (empty string, stray characters,
/// more than two fraction digits).
pub fn to_cents(price: &str) -> Option<i64> {
    let (negative, rest) = match price.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, price),
    };
    if rest.is_empty() {
        return None;
    }

    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rest, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > 2 {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let units: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut frac: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().ok()?
    };
    if frac_part.len() == 1 {
        frac *= 10;
    }

    let cents = units.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -cents } else { cents })
}

/// Format integer cents back into the shortest equivalent price string.
///
/// `700` → `"7"`, `750` → `"7.5"`, `755` → `"7.55"`.
pub fn from_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = abs / 100;
    let frac = abs % 100;
    if frac == 0 {
        format!("{sign}{units}")
    } else if frac % 10 == 0 {
        format!("{sign}{units}.{}", frac / 10)
    } else {
        format!("{sign}{units}.{frac:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integers_and_decimals() {
        assert_eq!(to_cents("7"), Some(700));
        assert_eq!(to_cents("7.5"), Some(750));
        assert_eq!(to_cents("7.55"), Some(755));
        assert_eq!(to_cents("0.05"), Some(5));
        assert_eq!(to_cents(".5"), Some(50));
        assert_eq!(to_cents("-12.50"), Some(-1250));
    }

    #[test]
    fn rejects_malformed_prices() {
        assert_eq!(to_cents(""), None);
        assert_eq!(to_cents("-"), None);
        assert_eq!(to_cents("."), None);
        assert_eq!(to_cents("7.555"), None);
        assert_eq!(to_cents("7a"), None);
        assert_eq!(to_cents("1,50"), None);
    }

    #[test]
    fn formats_shortest_form() {
        assert_eq!(from_cents(700), "7");
        assert_eq!(from_cents(750), "7.5");
        assert_eq!(from_cents(755), "7.55");
        assert_eq!(from_cents(5), "0.05");
        assert_eq!(from_cents(0), "0");
        assert_eq!(from_cents(-1250), "-12.5");
    }

    #[test]
    fn round_trips_through_cents() {
        for price in ["0", "19.99", "3.5", "-0.25"] {
            let cents = to_cents(price).unwrap();
            assert_eq!(to_cents(&from_cents(cents)), Some(cents));
        }
    }
}
