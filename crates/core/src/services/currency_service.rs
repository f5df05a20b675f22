use rust_decimal::{Decimal, RoundingStrategy};

use crate::api::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::exchange::{ConversionDirection, ExchangeRate};

/// Convert `amount` across the currency pair at `rate`, or `None` when the
/// result does not fit in a `Decimal`.
///
/// `AToB` multiplies, `BToA` divides. A zero rate converts to zero rather
/// than failing.
pub fn checked_convert(amount: Decimal, direction: ConversionDirection, rate: Decimal) -> Option<Decimal> {
    match direction {
        ConversionDirection::AToB => amount.checked_mul(rate),
        ConversionDirection::BToA if rate.is_zero() => Some(Decimal::ZERO),
        ConversionDirection::BToA => amount.checked_div(rate),
    }
}

/// Same as [`checked_convert`], except that an overflowing result saturates
/// at `Decimal::MAX` or `Decimal::MIN` following the sign of the result.
pub fn convert(amount: Decimal, direction: ConversionDirection, rate: Decimal) -> Decimal {
    checked_convert(amount, direction, rate).unwrap_or_else(|| {
        if amount.is_sign_negative() != rate.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// Render a converted amount with two decimals, e.g. `150000.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Holds the last successfully fetched rate for the configured pair.
///
/// Conversion is disabled until a rate has been fetched, and again after a
/// failed refresh, until the next successful one.
#[derive(Debug, Default)]
pub struct CurrencyService {
    rate: Option<ExchangeRate>,
    last_error: Option<String>,
}

impl CurrencyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the current rate. On failure the stored rate is dropped and the
    /// error message kept for display.
    pub async fn refresh_rate(&mut self, api: &dyn ExpenseApi) -> Result<Decimal, CoreError> {
        let result = api.get_exchange_rate().await.and_then(|body| {
            if body.success {
                Ok(body)
            } else {
                Err(CoreError::Api {
                    status: 200,
                    message: "Exchange API returned success = false".into(),
                })
            }
        });

        match result {
            Ok(body) => {
                let rate = body.rate;
                log::debug!("Exchange rate {}→{} = {rate}", body.base, body.target);
                self.rate = Some(body);
                self.last_error = None;
                Ok(rate)
            }
            Err(e) => {
                log::error!("Failed to fetch exchange rate: {e}");
                self.rate = None;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Convert with the stored rate. An amount whose conversion overflows
    /// is rejected as invalid input.
    pub fn convert(&self, amount: Decimal, direction: ConversionDirection) -> Result<Decimal, CoreError> {
        let rate = self
            .rate
            .as_ref()
            .ok_or_else(|| CoreError::ValidationError("Exchange rate not loaded".into()))?;
        checked_convert(amount, direction, rate.rate).ok_or_else(|| {
            CoreError::ValidationError(format!("Amount {amount} is too large to convert"))
        })
    }

    pub fn rate(&self) -> Option<&ExchangeRate> {
        self.rate.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.rate.is_some()
    }

    /// Install a rate obtained elsewhere (e.g. restored from a previous
    /// session).
    pub fn set_rate(&mut self, rate: ExchangeRate) {
        self.rate = Some(rate);
        self.last_error = None;
    }
}
