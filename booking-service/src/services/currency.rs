//! Display-to-settlement currency normalization.
//!
//! The gateway settles in USD while prices are displayed in RWF. Conversion
//! happens once, at intent creation, with a fixed configured rate; the
//! original values ride along in intent metadata so webhooks can recover
//! them without a reverse conversion.

use crate::config::CurrencyConfig;
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SETTLEMENT_CURRENCY: &str = "usd";

/// Currencies a client may submit prices in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayCurrency {
    Rwf,
    Usd,
}

impl FromStr for DisplayCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rwf" => Ok(DisplayCurrency::Rwf),
            "usd" => Ok(DisplayCurrency::Usd),
            other => Err(format!("unsupported currency `{}`", other)),
        }
    }
}

impl fmt::Display for DisplayCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayCurrency::Rwf => "rwf",
            DisplayCurrency::Usd => "usd",
        })
    }
}

/// Both sides of a normalized amount: what the gateway charges and what the
/// user was shown.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAmount {
    pub settlement_amount_minor: u64,
    pub settlement_currency: &'static str,
    pub original_amount: f64,
    pub original_currency: DisplayCurrency,
}

#[derive(Clone)]
pub struct CurrencyNormalizer {
    rwf_per_usd: f64,
    min_amount_rwf: f64,
}

impl CurrencyNormalizer {
    pub fn new(config: &CurrencyConfig) -> Self {
        Self {
            rwf_per_usd: config.rwf_per_usd,
            min_amount_rwf: config.min_amount_rwf,
        }
    }

    pub fn min_amount_rwf(&self) -> f64 {
        self.min_amount_rwf
    }

    /// Pure conversion into settlement minor units. RWF amounts below the
    /// configured floor fail before any gateway call; the floor is sized so
    /// the converted charge clears the provider-side minimum.
    pub fn normalize(
        &self,
        amount: f64,
        currency: DisplayCurrency,
    ) -> Result<NormalizedAmount, PaymentError> {
        let settlement_amount_minor = match currency {
            DisplayCurrency::Usd => (amount * 100.0).round() as u64,
            DisplayCurrency::Rwf => {
                if amount < self.min_amount_rwf {
                    return Err(PaymentError::AmountTooSmall {
                        min_amount: self.min_amount_rwf,
                    });
                }
                // Round half-up to the nearest cent.
                (amount / self.rwf_per_usd * 100.0).round() as u64
            }
        };

        Ok(NormalizedAmount {
            settlement_amount_minor,
            settlement_currency: SETTLEMENT_CURRENCY,
            original_amount: amount,
            original_currency: currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(rate: f64, min: f64) -> CurrencyNormalizer {
        CurrencyNormalizer::new(&CurrencyConfig {
            rwf_per_usd: rate,
            min_amount_rwf: min,
        })
    }

    #[test]
    fn rwf_converts_at_fixed_rate() {
        let normalized = normalizer(1300.0, 1000.0)
            .normalize(13000.0, DisplayCurrency::Rwf)
            .unwrap();
        assert_eq!(normalized.settlement_amount_minor, 1000);
        assert_eq!(normalized.settlement_currency, "usd");
        assert_eq!(normalized.original_amount, 13000.0);
        assert_eq!(normalized.original_currency, DisplayCurrency::Rwf);
    }

    #[test]
    fn conversion_rounds_half_up() {
        // 1.5 RWF at 100 RWF/USD is exactly 1.5 cents.
        let normalized = normalizer(100.0, 1.0)
            .normalize(1.5, DisplayCurrency::Rwf)
            .unwrap();
        assert_eq!(normalized.settlement_amount_minor, 2);
    }

    #[test]
    fn floor_is_inclusive() {
        let normalizer = normalizer(1300.0, 1000.0);
        assert!(normalizer.normalize(1000.0, DisplayCurrency::Rwf).is_ok());

        let err = normalizer
            .normalize(999.0, DisplayCurrency::Rwf)
            .unwrap_err();
        match err {
            PaymentError::AmountTooSmall { min_amount } => assert_eq!(min_amount, 1000.0),
            other => panic!("expected AmountTooSmall, got {:?}", other),
        }
    }

    #[test]
    fn usd_is_identity_scaled_to_cents() {
        let normalized = normalizer(1300.0, 1000.0)
            .normalize(12.34, DisplayCurrency::Usd)
            .unwrap();
        assert_eq!(normalized.settlement_amount_minor, 1234);
    }

    #[test]
    fn usd_has_no_local_floor() {
        // Below the RWF floor equivalent, still accepted locally; the
        // provider minimum applies remotely.
        let normalized = normalizer(1300.0, 1000.0)
            .normalize(0.30, DisplayCurrency::Usd)
            .unwrap();
        assert_eq!(normalized.settlement_amount_minor, 30);
    }

    #[test]
    fn unknown_currency_is_rejected_at_parse() {
        assert!("eur".parse::<DisplayCurrency>().is_err());
        assert_eq!("RWF".parse::<DisplayCurrency>().unwrap(), DisplayCurrency::Rwf);
    }
}
