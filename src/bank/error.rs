use thiserror::Error;

use crate::db;
use crate::types::Id;

pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while posting money movements.
///
/// Business denials and idempotent replays are not errors; they come back as
/// terminal [`crate::bank::Posting`] variants. Only validation failures and
/// genuinely unexpected store failures unwind through this type.
#[derive(Error, Debug)]
pub enum Error {
	#[error("db error: {0}")]
	Database(#[from] db::Error),
	#[error("account {0} does not exist")]
	AccountNotFound(Id),
	#[error("payee {0} does not exist")]
	PayeeNotFound(Id),
	#[error("rule {0} does not exist")]
	RuleNotFound(Id),
	#[error("rule {0} is inactive, lapsed, or not yet due")]
	RuleNotRunnable(Id),
	#[error("invalid amount: {0}")]
	InvalidAmount(String),
	/// An idempotency key matched one leg of a transfer but not the other;
	/// the natural keys disagree and the whole unit is rolled back.
	#[error("idempotent replay matched only one leg of a transfer")]
	PartialReplay,
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		Error::Database(db::Error::from(e))
	}
}

impl From<r2d2::Error> for Error {
	fn from(e: r2d2::Error) -> Self {
		Error::Database(db::Error::from(e))
	}
}
