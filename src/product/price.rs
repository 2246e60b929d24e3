//! Fixed-point currency amounts
//!
//! Prices are held as an integer count of minor units (cents) so that every
//! comparison and distance computation is exact. Conversion to a decimal
//! happens only at the HTTP boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Minor units per major unit (cents per dollar)
const MINOR_PER_MAJOR: i64 = 100;

/// Errors produced while parsing a price string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,

    #[error("no amount found in '{0}'")]
    Malformed(String),

    #[error("more than two fractional digits in '{0}'")]
    TooPrecise(String),

    #[error("amount out of range: '{0}'")]
    Overflow(String),
}

/// A currency amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Creates a price from a count of minor units
    pub const fn from_minor_units(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute distance between two prices, in minor units
    pub fn abs_diff(self, other: Price) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Converts to a two-place decimal for the wire format
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts an exact decimal amount
    ///
    /// Fails with `TooPrecise` when the amount has more than two
    /// significant fractional digits.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        let normalized = amount.normalize();
        if normalized.scale() > 2 {
            return Err(PriceError::TooPrecise(amount.to_string()));
        }
        normalized
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .and_then(|minor| minor.trunc().to_i64())
            .map(Self)
            .ok_or_else(|| PriceError::Overflow(amount.to_string()))
    }

    /// Parses a human-formatted price string
    ///
    /// The first numeric group in the input is used, so labels such as
    /// `"$3.49/lb"` or `"USD 3"` are accepted. Both `.` and `,` are
    /// recognised as decimal points:
    ///
    /// - When both appear, the one occurring last is the decimal point
    /// - A single `.` is always the decimal point, so `"$3.490"` is
    ///   rejected as too precise rather than read as 3490
    /// - A single `,` is the decimal point unless followed by exactly three
    ///   digits (`"3,49"` versus `"1,234"`)
    /// - A repeated separator is a thousands separator (`"1.234.567"`)
    ///
    /// A `-` before the amount yields a negative price; callers that need a
    /// non-negative value must check [`Price::is_negative`].
    ///
    /// # Examples
    ///
    /// ```
    /// use grocry::product::Price;
    ///
    /// assert_eq!(Price::parse("$1,234.56").unwrap().minor_units(), 123456);
    /// assert_eq!(Price::parse("3,49 €").unwrap().minor_units(), 349);
    /// ```
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let bytes = trimmed.as_bytes();
        let is_separator = |b: u8| b == b'.' || b == b',';

        // Start at the first digit, or at a separator directly followed by one (".99")
        let start = (0..bytes.len())
            .find(|&i| {
                bytes[i].is_ascii_digit()
                    || (is_separator(bytes[i])
                        && bytes.get(i + 1).map_or(false, |b| b.is_ascii_digit()))
            })
            .ok_or_else(|| PriceError::Malformed(trimmed.to_string()))?;

        let prefix = &trimmed[..start];
        let negative = prefix.contains('-') || prefix.contains('\u{2212}');

        let len = bytes[start..]
            .iter()
            .take_while(|&&b| b.is_ascii_digit() || is_separator(b))
            .count();
        let body = trimmed[start..start + len].trim_end_matches(&['.', ','][..]);

        let decimal_at = match (body.rfind('.'), body.rfind(',')) {
            (Some(dot), Some(comma)) => Some(dot.max(comma)),
            (Some(at), None) | (None, Some(at)) => {
                let separator = body.as_bytes()[at] as char;
                let occurrences = body.matches(separator).count();
                let fraction_len = body.len() - at - 1;
                let integer_is_zero = body[..at].bytes().all(|b| b == b'0');
                let thousands_like = separator == ',' && fraction_len == 3 && !integer_is_zero;
                if occurrences == 1 && !thousands_like {
                    Some(at)
                } else {
                    None
                }
            }
            (None, None) => None,
        };

        let (integer, fraction) = match decimal_at {
            Some(at) => (&body[..at], &body[at + 1..]),
            None => (body, ""),
        };

        let overflow = || PriceError::Overflow(trimmed.to_string());

        let mut major: i64 = 0;
        for digit in integer.bytes().filter(u8::is_ascii_digit) {
            major = major
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(digit - b'0')))
                .ok_or_else(overflow)?;
        }

        let fraction = fraction.as_bytes();
        let minor = match fraction.len() {
            0 => 0,
            1 => i64::from(fraction[0] - b'0') * 10,
            2 => i64::from(fraction[0] - b'0') * 10 + i64::from(fraction[1] - b'0'),
            _ => return Err(PriceError::TooPrecise(trimmed.to_string())),
        };

        let total = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(overflow)?;

        Ok(Self(if negative { -total } else { total }))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per_major, abs % per_major)
    }
}
