use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USD_RATE: i64 = 1550;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Ngn,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ngn => "ngn",
            Self::Usd => "usd",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ngn" | "naira" => Ok(Self::Ngn),
            "usd" | "dollar" => Ok(Self::Usd),
            other => Err(format!("unsupported currency `{other}` (expected ngn|usd)")),
        }
    }
}

/// Display-only conversion. Amounts are always stored and computed in NGN.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormatter {
    usd_rate: Decimal,
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self { usd_rate: Decimal::from(DEFAULT_USD_RATE) }
    }
}

impl CurrencyFormatter {
    /// Falls back to the default rate when `usd_rate` is not positive.
    pub fn new(usd_rate: Decimal) -> Self {
        if usd_rate > Decimal::ZERO {
            Self { usd_rate }
        } else {
            Self::default()
        }
    }

    pub fn usd_rate(&self) -> Decimal {
        self.usd_rate
    }

    pub fn convert(&self, amount_ngn: Decimal, currency: Currency) -> Decimal {
        match currency {
            Currency::Ngn => amount_ngn,
            Currency::Usd => amount_ngn.checked_div(self.usd_rate).unwrap_or(Decimal::ZERO),
        }
    }

    pub fn format(&self, amount_ngn: Decimal, currency: Currency) -> String {
        let converted = self.convert(amount_ngn, currency);
        match currency {
            Currency::Ngn => with_symbol("₦", converted, 0),
            Currency::Usd => with_symbol("$", converted, 2),
        }
    }
}

fn with_symbol(symbol: &str, amount: Decimal, decimals: u32) -> String {
    let mut rounded =
        amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let digits = rounded.abs().to_string();
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (digits, None),
    };

    let mut out = format!("{sign}{symbol}{}", group_thousands(&whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
