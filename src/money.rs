use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Monetary amounts are integer minor units everywhere inside the core.
/// Decimal strings exist only at the external boundary.
pub type Cents = i64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
	#[error("unparseable amount {0:?}")]
	Unparseable(String),
	#[error("amount must be strictly positive")]
	NotPositive,
	#[error("amount has more than two fractional digits")]
	TooPrecise,
}

/// Parses a boundary amount string ("12.34") into cents.
///
/// Amounts must be strictly positive with at most two fractional digits;
/// scientific notation is rejected by the decimal parser.
pub fn parse_amount(s: &str) -> Result<Cents, ParseError> {
	let amount = Decimal::from_str(s.trim()).map_err(|_| ParseError::Unparseable(s.to_string()))?;
	if amount <= Decimal::ZERO {
		return Err(ParseError::NotPositive);
	}

	let amount = amount.normalize();
	if amount.scale() > 2 {
		return Err(ParseError::TooPrecise);
	}

	// overflow on the scale-up (or on the i64 conversion) is a caller
	// error, not a panic
	amount
		.checked_mul(Decimal::ONE_HUNDRED)
		.and_then(|cents| cents.to_i64())
		.ok_or_else(|| ParseError::Unparseable(s.to_string()))
}

/// Formats cents as a two-digit decimal string for client display.
pub fn format_cents(cents: Cents) -> String {
	let sign = if cents < 0 { "-" } else { "" };
	let magnitude = cents.unsigned_abs();
	format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}
