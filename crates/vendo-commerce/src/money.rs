//! Money type for representing monetary values.
//!
//! Amounts are stored as integer counts of the currency's minor unit
//! (pence, cents) to avoid the floating-point precision issues that
//! plague monetary calculations. Every division goes through a single
//! round-half-up helper, applied at final computation points only.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
        }
    }

    /// Get the currency symbol (e.g., "$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
            Currency::CAD => "CA$",
            Currency::AUD => "A$",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in the smallest unit of the currency (e.g., pence
/// for GBP). Arithmetic is checked: mixing currencies or overflowing
/// `i64` surfaces a [`CommerceError`] instead of producing a wrong total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the currency's minor unit.
    pub amount: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    fn check_currency(&self, other: &Money) -> Result<(), CommerceError> {
        if self.currency != other.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: other.currency.code().to_string(),
            });
        }
        Ok(())
    }

    /// Add another Money value.
    pub fn add(&self, other: &Money) -> Result<Money, CommerceError> {
        self.check_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Subtract another Money value.
    pub fn subtract(&self, other: &Money) -> Result<Money, CommerceError> {
        self.check_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Multiply by an integer factor (e.g., a quantity).
    pub fn multiply(&self, factor: i64) -> Result<Money, CommerceError> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Calculate an integer percentage of this amount, rounded half-up.
    pub fn percentage(&self, percent: i64) -> Result<Money, CommerceError> {
        let amount = round_half_up(self.amount as i128 * percent as i128, 100)?;
        Ok(Money::new(amount, self.currency))
    }

    /// The tax portion embedded in a price that already includes tax at
    /// the given integer percentage rate, rounded half-up.
    ///
    /// For a total of 1000 at 20% this is `1000 * 20 / 120 = 167`.
    pub fn inclusive_portion(&self, percent: i64) -> Result<Money, CommerceError> {
        let denominator = 100i128
            .checked_add(percent as i128)
            .ok_or(CommerceError::Overflow)?;
        if denominator <= 0 {
            return Err(CommerceError::Overflow);
        }
        let amount = round_half_up(self.amount as i128 * percent as i128, denominator)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Distribute this amount across weighted shares so the shares sum
    /// exactly to the original amount.
    ///
    /// Uses the largest-remainder method: each share gets its floored
    /// proportion, then leftover minor units go to the shares with the
    /// largest remainders (earliest first on ties). No minor unit is
    /// ever lost or invented.
    pub fn allocate(&self, weights: &[i64]) -> Result<Vec<Money>, CommerceError> {
        let total_weight: i128 = weights.iter().map(|w| *w as i128).sum();
        if weights.is_empty() || total_weight <= 0 {
            return Err(CommerceError::InvalidAllocation);
        }
        if weights.iter().any(|w| *w < 0) {
            return Err(CommerceError::InvalidAllocation);
        }

        let negative = self.amount < 0;
        let amount = self.amount.unsigned_abs() as i128;

        let mut shares: Vec<i128> = Vec::with_capacity(weights.len());
        let mut remainders: Vec<(i128, usize)> = Vec::with_capacity(weights.len());
        let mut allocated: i128 = 0;

        for (index, weight) in weights.iter().enumerate() {
            let scaled = amount * *weight as i128;
            let base = scaled / total_weight;
            shares.push(base);
            remainders.push((scaled % total_weight, index));
            allocated += base;
        }

        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut leftover = amount - allocated;
        for (_, index) in &remainders {
            if leftover == 0 {
                break;
            }
            shares[*index] += 1;
            leftover -= 1;
        }

        shares
            .into_iter()
            .map(|share| {
                let share = if negative { -share } else { share };
                i64::try_from(share)
                    .map(|amount| Money::new(amount, self.currency))
                    .map_err(|_| CommerceError::Overflow)
            })
            .collect()
    }

    /// Sum an iterator of Money values in the given currency.
    pub fn sum<'a>(
        iter: impl Iterator<Item = &'a Money>,
        currency: Currency,
    ) -> Result<Money, CommerceError> {
        let mut total = Money::zero(currency);
        for money in iter {
            total = total.add(money)?;
        }
        Ok(total)
    }

    /// Format for the given locale (e.g., "en-GB" -> "£1,234.56").
    ///
    /// Surfaces [`CommerceError::FormattingUnavailable`] for locales
    /// without a registered formatter.
    pub fn format(&self, locale: &str) -> Result<String, CommerceError> {
        let spec = LocaleSpec::lookup(locale)
            .ok_or_else(|| CommerceError::FormattingUnavailable(locale.to_string()))?;

        let places = self.currency.decimal_places();
        let divisor = 10u64.pow(places);
        let minor = self.amount.unsigned_abs();
        let major = minor / divisor;
        let fraction = minor % divisor;

        let mut body = group_digits(&major.to_string(), spec.group_separator);
        if places > 0 {
            body.push(spec.decimal_separator);
            body.push_str(&format!("{:0width$}", fraction, width = places as usize));
        }

        let sign = if self.amount < 0 { "-" } else { "" };
        if spec.symbol_first {
            Ok(format!("{}{}{}", sign, self.currency.symbol(), body))
        } else {
            Ok(format!("{}{} {}", sign, body, self.currency.symbol()))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.decimal_places();
        let divisor = 10u64.pow(places);
        let minor = self.amount.unsigned_abs();
        let sign = if self.amount < 0 { "-" } else { "" };
        if places == 0 {
            write!(f, "{}{}{}", sign, self.currency.symbol(), minor)
        } else {
            write!(
                f,
                "{}{}{}.{:0width$}",
                sign,
                self.currency.symbol(),
                minor / divisor,
                minor % divisor,
                width = places as usize
            )
        }
    }
}

/// Divide with round-half-up semantics. The denominator must be positive.
fn round_half_up(numerator: i128, denominator: i128) -> Result<i64, CommerceError> {
    let rounded = if numerator >= 0 {
        (numerator * 2 + denominator) / (denominator * 2)
    } else {
        -((-numerator * 2 + denominator) / (denominator * 2))
    };
    i64::try_from(rounded).map_err(|_| CommerceError::Overflow)
}

struct LocaleSpec {
    group_separator: char,
    decimal_separator: char,
    symbol_first: bool,
}

impl LocaleSpec {
    fn lookup(locale: &str) -> Option<Self> {
        match locale {
            "en-US" | "en-GB" | "en-AU" | "en-CA" | "ja-JP" => Some(Self {
                group_separator: ',',
                decimal_separator: '.',
                symbol_first: true,
            }),
            "de-DE" | "nl-NL" => Some(Self {
                group_separator: '.',
                decimal_separator: ',',
                symbol_first: false,
            }),
            "fr-FR" => Some(Self {
                group_separator: ' ',
                decimal_separator: ',',
                symbol_first: false,
            }),
            _ => None,
        }
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let count = digits.len();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (count - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_addition() {
        let a = Money::new(1000, Currency::GBP);
        let b = Money::new(500, Currency::GBP);
        assert_eq!(a.add(&b).unwrap().amount, 1500);
    }

    #[test]
    fn test_money_subtraction() {
        let a = Money::new(1000, Currency::GBP);
        let b = Money::new(300, Currency::GBP);
        assert_eq!(a.subtract(&b).unwrap().amount, 700);
    }

    #[test]
    fn test_money_currency_mismatch() {
        let usd = Money::new(1000, Currency::USD);
        let eur = Money::new(1000, Currency::EUR);
        assert!(matches!(
            usd.add(&eur),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_money_multiply() {
        let m = Money::new(1099, Currency::GBP);
        assert_eq!(m.multiply(3).unwrap().amount, 3297);
    }

    #[test]
    fn test_money_multiply_overflow() {
        let m = Money::new(i64::MAX, Currency::GBP);
        assert!(matches!(m.multiply(2), Err(CommerceError::Overflow)));
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 150 = 22.5, rounds up to 23
        let m = Money::new(150, Currency::GBP);
        assert_eq!(m.percentage(15).unwrap().amount, 23);

        let m = Money::new(10000, Currency::GBP);
        assert_eq!(m.percentage(10).unwrap().amount, 1000);
    }

    #[test]
    fn test_inclusive_portion() {
        // 1000 with 20% embedded: 1000 * 20 / 120 = 166.67 -> 167
        let m = Money::new(1000, Currency::GBP);
        assert_eq!(m.inclusive_portion(20).unwrap().amount, 167);
    }

    #[test]
    fn test_allocate_conserves_total() {
        let m = Money::new(333, Currency::GBP);
        let shares = m.allocate(&[500, 500]).unwrap();
        assert_eq!(shares[0].amount, 167);
        assert_eq!(shares[1].amount, 166);
        assert_eq!(shares[0].amount + shares[1].amount, 333);
    }

    #[test]
    fn test_allocate_many_shares() {
        let m = Money::new(1000, Currency::GBP);
        for count in 1..=10usize {
            let weights = vec![1i64; count];
            let shares = m.allocate(&weights).unwrap();
            let total: i64 = shares.iter().map(|s| s.amount).sum();
            assert_eq!(total, 1000, "lost minor units across {count} shares");
        }
    }

    #[test]
    fn test_allocate_weighted() {
        let m = Money::new(100, Currency::GBP);
        let shares = m.allocate(&[3, 1]).unwrap();
        assert_eq!(shares[0].amount, 75);
        assert_eq!(shares[1].amount, 25);
    }

    #[test]
    fn test_allocate_rejects_zero_weights() {
        let m = Money::new(100, Currency::GBP);
        assert!(matches!(
            m.allocate(&[]),
            Err(CommerceError::InvalidAllocation)
        ));
        assert!(matches!(
            m.allocate(&[0, 0]),
            Err(CommerceError::InvalidAllocation)
        ));
    }

    #[test]
    fn test_format_known_locales() {
        let m = Money::new(123_456, Currency::GBP);
        assert_eq!(m.format("en-GB").unwrap(), "\u{00a3}1,234.56");

        let m = Money::new(123_456, Currency::EUR);
        assert_eq!(m.format("de-DE").unwrap(), "1.234,56 \u{20ac}");
    }

    #[test]
    fn test_format_unknown_locale() {
        let m = Money::new(100, Currency::GBP);
        assert!(matches!(
            m.format("xx-XX"),
            Err(CommerceError::FormattingUnavailable(_))
        ));
    }

    #[test]
    fn test_format_zero_decimal_currency() {
        let m = Money::new(1500, Currency::JPY);
        assert_eq!(m.format("ja-JP").unwrap(), "\u{00a5}1,500");
    }

    #[test]
    fn test_display() {
        let m = Money::new(4999, Currency::USD);
        assert_eq!(m.to_string(), "$49.99");

        let m = Money::new(-250, Currency::GBP);
        assert_eq!(m.to_string(), "-\u{00a3}2.50");
    }

    #[test]
    fn test_sum() {
        let values = [
            Money::new(100, Currency::GBP),
            Money::new(250, Currency::GBP),
        ];
        let total = Money::sum(values.iter(), Currency::GBP).unwrap();
        assert_eq!(total.amount, 350);
    }
}
