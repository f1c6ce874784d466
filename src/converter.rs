use crate::currency::{Currency, RateSnapshot};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("not a number: {0}")]
    Invalid(String),
}

/// Converts `amount` using the ratio of the two base-relative rates.
pub fn convert(amount: f64, from: Currency, to: Currency, snapshot: &RateSnapshot) -> f64 {
    if from == to {
        return amount;
    }
    amount * (snapshot.rate(to) / snapshot.rate(from))
}

/// Exchanges source and target so converting the result gives back the original amount.
pub fn swap(from: Currency, to: Currency) -> (Currency, Currency) {
    (to, from)
}

/// Parses the amount field. Unlike the calculator, bad input is reported, not zeroed.
pub fn parse_amount(text: &str) -> Result<f64, AmountError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AmountError::Invalid(trimmed.to_string())),
    }
}
