//! Currency symbols, pairs and the rate lookup abstraction

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Symbols offered by the converter, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Btc,
    Eth,
    Xrp,
    Bch,
    Ltc,
    Ada,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Btc,
        Currency::Eth,
        Currency::Xrp,
        Currency::Bch,
        Currency::Ltc,
        Currency::Ada,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::Xrp => "XRP",
            Currency::Bch => "BCH",
            Currency::Ltc => "LTC",
            Currency::Ada => "ADA",
        }
    }

    /// Every other listed currency, in display order.
    pub fn targets(self) -> impl Iterator<Item = Currency> {
        Self::ALL.into_iter().filter(move |c| *c != self)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown currency: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCurrency(s.to_string()))
    }
}

/// An ordered (base, target) pair. Formats as `BASE-TARGET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub base: Currency,
    pub target: Currency,
}

impl Pair {
    pub fn new(base: Currency, target: Currency) -> Self {
        Self { base, target }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.target)
    }
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Returns how many units of `pair.target` one unit of `pair.base` buys.
    async fn get_rate(&self, pair: &Pair) -> Result<f64>;
}
