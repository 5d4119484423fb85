//! Currency formatting for display.
//!
//! Formatting is a pure function of the amount. The cart engine itself never
//! formats; only [`crate::CartView`] does.

use rust_decimal::{Decimal, RoundingStrategy};

/// Turns an amount into display text.
pub trait CurrencyFormatter {
    /// Format `value` for display.
    fn format_value(&self, value: Decimal) -> String;
}

impl<F> CurrencyFormatter for F
where
    F: Fn(Decimal) -> String,
{
    fn format_value(&self, value: Decimal) -> String {
        self(value)
    }
}

/// Symbol and separator conventions for one currency.
///
/// Always two fraction digits, rounded half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyFormat {
    /// Currency symbol placed before the amount.
    pub symbol: &'static str,
    /// Text between the symbol and the digits.
    pub symbol_spacing: &'static str,
    /// Separator between whole and fractional digits.
    pub decimal_separator: char,
    /// Separator between groups of three whole digits.
    pub thousands_separator: char,
}

impl MoneyFormat {
    /// Brazilian real: `R$ 1.234,50`.
    #[must_use]
    pub const fn brl() -> Self {
        Self {
            symbol: "R$",
            symbol_spacing: " ",
            decimal_separator: ',',
            thousands_separator: '.',
        }
    }

    /// US dollar: `$1,234.50`.
    #[must_use]
    pub const fn usd() -> Self {
        Self {
            symbol: "$",
            symbol_spacing: "",
            decimal_separator: '.',
            thousands_separator: ',',
        }
    }

    /// Euro: `€1.234,50`.
    #[must_use]
    pub const fn eur() -> Self {
        Self {
            symbol: "€",
            symbol_spacing: "",
            decimal_separator: ',',
            thousands_separator: '.',
        }
    }

    /// Look up a preset by ISO 4217 code (case-insensitive).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "BRL" => Some(Self::brl()),
            "USD" => Some(Self::usd()),
            "EUR" => Some(Self::eur()),
            _ => None,
        }
    }
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::brl()
    }
}

impl CurrencyFormatter for MoneyFormat {
    fn format_value(&self, value: Decimal) -> String {
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let digits = format!("{:.2}", rounded.abs());
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(self.thousands_separator);
            }
            grouped.push(c);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        format!(
            "{sign}{}{}{grouped}{}{fraction}",
            self.symbol, self.symbol_spacing, self.decimal_separator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brl() {
        let fmt = MoneyFormat::brl();
        assert_eq!(fmt.format_value(Decimal::new(123_450, 2)), "R$ 1.234,50");
        assert_eq!(fmt.format_value(Decimal::from(5)), "R$ 5,00");
    }

    #[test]
    fn test_usd_grouping() {
        let fmt = MoneyFormat::usd();
        assert_eq!(fmt.format_value(Decimal::from(1_234_567)), "$1,234,567.00");
        assert_eq!(fmt.format_value(Decimal::new(99_999, 2)), "$999.99");
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let fmt = MoneyFormat::usd();
        assert_eq!(fmt.format_value(Decimal::new(1005, 3)), "$1.01");
        assert_eq!(fmt.format_value(Decimal::new(-1005, 3)), "-$1.01");
    }

    #[test]
    fn test_zero_has_no_sign() {
        let fmt = MoneyFormat::usd();
        assert_eq!(fmt.format_value(Decimal::new(-1, 3)), "$0.00");
        assert_eq!(fmt.format_value(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(MoneyFormat::from_code("usd"), Some(MoneyFormat::usd()));
        assert_eq!(MoneyFormat::from_code("EUR"), Some(MoneyFormat::eur()));
        assert_eq!(MoneyFormat::from_code("JPY"), None);
    }

    #[test]
    fn test_closure_formatter() {
        let fmt = |value: Decimal| format!("{value} units");
        assert_eq!(fmt.format_value(Decimal::from(3)), "3 units");
    }
}
