use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange rate body from the `exchange` endpoint, e.g.
/// `{"base":"USD","target":"LBP","rate":89500.5,"last_updated":"...","success":true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub target: String,
    pub rate: Decimal,
    #[serde(default)]
    pub last_updated: String,
    pub success: bool,
}

/// Which way to convert between the configured currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionDirection {
    /// Base → target: multiply by the rate (e.g. USD → LBP).
    AToB,
    /// Target → base: divide by the rate.
    BToA,
}
