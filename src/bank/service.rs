use diesel::prelude::*;
use log::{debug, info};

use crate::account::DeltaOutcome;
use crate::money::Cents;
use crate::transaction::{InsertOutcome, NewTransaction, Status, Transaction, Type};
use crate::types::Time;
use crate::{account, db, payee, rule, transaction};

use super::error::{Error, Result};

/// Intent to move money on a single account: positive cents credit the
/// account, negative cents debit it.
#[derive(Copy, Clone)]
pub struct PostIntent<'a> {
	pub account_id: &'a str,
	pub amount_cents: Cents,
	pub transaction_type: Type,
	pub idempotency_key: Option<&'a str>,
	pub rule_id: Option<&'a str>,
}

/// Terminal outcome of a posting attempt. There is no pending state: a
/// request is approved, denied, or recognized as a replay.
#[derive(Debug, PartialEq)]
pub enum Posting {
	Approved { transaction: Transaction },
	Denied { transaction: Transaction, reason: DenyReason },
	Duplicate { existing: Transaction },
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum DenyReason {
	InsufficientFunds,
	InactiveAccount,
	InactivePayee,
}

/// Destination of an external transfer.
///
/// `Unresolved` recipients are accepted by design: only the outbound leg is
/// recorded and the funds leave this ledger.
#[derive(Copy, Clone)]
pub enum Destination<'a> {
	Resolved(&'a str),
	Unresolved,
}

/// Terminal outcome of a transfer. `inbound` is absent for the deliberate
/// one-leg case (unresolved external recipient, bill-pay to a payee).
#[derive(Debug, PartialEq)]
pub enum Transfer {
	Posted {
		outbound: Transaction,
		inbound: Option<Transaction>,
	},
	Denied {
		transaction: Transaction,
		reason: DenyReason,
	},
	Duplicate {
		existing: Transaction,
	},
}

impl From<Posting> for Transfer {
	fn from(posting: Posting) -> Transfer {
		match posting {
			Posting::Approved { transaction } => Transfer::Posted {
				outbound: transaction,
				inbound: None,
			},
			Posting::Denied { transaction, reason } => Transfer::Denied { transaction, reason },
			Posting::Duplicate { existing } => Transfer::Duplicate { existing },
		}
	}
}

/// Parameter object for creating a new Service
pub struct NewService<'a> {
	pub db: db::SqlitePool,
	pub account_repo: &'a account::Repo,
	pub transaction_repo: &'a transaction::Repo,
	pub payee_repo: &'a payee::Repo,
	pub rule_repo: &'a rule::Repo,
}

/// Service for posting money movements against the ledger.
///
/// Every public operation runs as one immediate (write) database
/// transaction: the idempotency guard, the conditional balance update, and
/// the ledger insert commit or roll back together.
pub struct Service<'a> {
	db: db::SqlitePool,
	account_repo: &'a account::Repo,
	transaction_repo: &'a transaction::Repo,
	payee_repo: &'a payee::Repo,
	rule_repo: &'a rule::Repo,
}

impl<'a> Service<'a> {
	pub fn new(v: NewService<'a>) -> Self {
		Service {
			db: v.db,
			account_repo: v.account_repo,
			transaction_repo: v.transaction_repo,
			payee_repo: v.payee_repo,
			rule_repo: v.rule_repo,
		}
	}

	/// Posts a single-account money movement (deposit, withdrawal, or an
	/// API-key credit/debit).
	pub fn post(&self, intent: &PostIntent) -> Result<Posting> {
		let conn = &mut self.db.get().map_err(db::Error::from)?;
		conn.immediate_transaction(|conn| self.post_leg(conn, intent))
	}

	/// Transfers funds between two ledger accounts. Both legs post with
	/// exact-negative amounts, or neither does.
	pub fn transfer(
		&self,
		source_id: &str,
		destination_id: &str,
		amount_cents: Cents,
		idempotency_key: Option<&str>,
	) -> Result<Transfer> {
		let conn = &mut self.db.get().map_err(db::Error::from)?;
		conn.immediate_transaction(|conn| {
			self.transfer_legs(
				conn,
				source_id,
				&Destination::Resolved(destination_id),
				amount_cents,
				Type::InternalTransfer,
				idempotency_key,
				None,
			)
		})
	}

	/// Zelle-style transfer out of a ledger account. A `Resolved` destination
	/// posts both legs; an `Unresolved` one accepts the request and records
	/// only the outbound leg.
	pub fn external_transfer(
		&self,
		source_id: &str,
		destination: &Destination,
		amount_cents: Cents,
		idempotency_key: Option<&str>,
	) -> Result<Transfer> {
		let conn = &mut self.db.get().map_err(db::Error::from)?;
		conn.immediate_transaction(|conn| {
			self.transfer_legs(
				conn,
				source_id,
				destination,
				amount_cents,
				Type::ExternalTransfer,
				idempotency_key,
				None,
			)
		})
	}

	/// Fires one due occurrence of a recurring rule.
	///
	/// The posting and the next-run advancement share the atomic unit, and
	/// the derived occurrence key makes re-driving the scheduler safe: a
	/// driver that crashed after committing and runs again gets `Duplicate`,
	/// not a second posting.
	pub fn execute_rule(&self, rule_id: &str, now_at: Time) -> Result<Transfer> {
		let conn = &mut self.db.get().map_err(db::Error::from)?;
		conn.immediate_transaction(|conn| {
			let rule = match self.rule_repo.find_by_id(conn, rule_id) {
				Ok(rule) => rule,
				Err(db::Error::RecordNotFound) => return Err(Error::RuleNotFound(rule_id.to_string())),
				Err(e) => return Err(e.into()),
			};
			if !rule.is_active {
				return Err(Error::RuleNotRunnable(rule_id.to_string()));
			}
			let occurrence = match rule.next_run_at {
				Some(occurrence) if occurrence <= now_at => occurrence,
				_ => return Err(Error::RuleNotRunnable(rule_id.to_string())),
			};

			let key = occurrence_key(&rule.id, occurrence);
			debug!("executing rule {} for occurrence {}", rule.id, occurrence);

			let outcome = match (&rule.payee_id, &rule.destination_account_id) {
				(Some(payee_id), _) => {
					let bill = NewTransaction {
						account_id: &rule.account_id,
						amount_cents: -rule.amount_cents,
						transaction_type: Type::Billpay,
						status: Status::Approved,
						idempotency_key: Some(&key),
						rule_id: Some(&rule.id),
					};
					let payee = match self.payee_repo.find_by_id(conn, payee_id) {
						Ok(payee) => payee,
						Err(db::Error::RecordNotFound) => {
							return Err(Error::PayeeNotFound(payee_id.clone()))
						}
						Err(e) => return Err(e.into()),
					};
					if payee.is_active {
						// payee destinations live outside this ledger, so a
						// bill payment is a one-leg posting
						self.transfer_legs(
							conn,
							&rule.account_id,
							&Destination::Unresolved,
							rule.amount_cents,
							Type::Billpay,
							Some(&key),
							Some(&rule.id),
						)?
					} else {
						Transfer::from(self.deny(conn, &bill, DenyReason::InactivePayee)?)
					}
				}
				(None, Some(destination_id)) => self.transfer_legs(
					conn,
					&rule.account_id,
					&Destination::Resolved(destination_id),
					rule.amount_cents,
					Type::InternalTransfer,
					Some(&key),
					Some(&rule.id),
				)?,
				(None, None) => return Err(Error::RuleNotRunnable(rule_id.to_string())),
			};

			self.rule_repo.advance(conn, &rule.id, now_at)?;
			Ok(outcome)
		})
	}

	/// Single-leg posting inside an open transaction: guard, balance change,
	/// ledger insert.
	fn post_leg(&self, conn: &mut SqliteConnection, intent: &PostIntent) -> Result<Posting> {
		if intent.amount_cents == 0 {
			return Err(Error::InvalidAmount("zero-cent posting".to_string()));
		}

		let account = match self.account_repo.find_by_id(conn, intent.account_id) {
			Ok(account) => account,
			Err(db::Error::RecordNotFound) => {
				return Err(Error::AccountNotFound(intent.account_id.to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		let new = NewTransaction {
			account_id: intent.account_id,
			amount_cents: intent.amount_cents,
			transaction_type: intent.transaction_type,
			status: Status::Approved,
			idempotency_key: intent.idempotency_key,
			rule_id: intent.rule_id,
		};

		if let Some(key) = intent.idempotency_key {
			if let Some(existing) = self.transaction_repo.find_existing(conn, key, &new)? {
				debug!(
					"idempotent replay of key {} on account {}",
					key, intent.account_id
				);
				return Ok(Posting::Duplicate { existing });
			}
		}

		if !account.is_active {
			return self.deny(conn, &new, DenyReason::InactiveAccount);
		}

		if intent.amount_cents < 0 {
			match self
				.account_repo
				.apply_delta(conn, intent.account_id, intent.amount_cents)?
			{
				DeltaOutcome::Applied(_) => {}
				DeltaOutcome::NotApplied => {
					return self.deny(conn, &new, DenyReason::InsufficientFunds);
				}
			}
		} else {
			self.account_repo
				.apply_delta(conn, intent.account_id, intent.amount_cents)?;
		}

		match self.transaction_repo.insert(conn, &new)? {
			InsertOutcome::Inserted(transaction) => Ok(Posting::Approved { transaction }),
			InsertOutcome::Conflict => {
				// a concurrent identical request won between the guard lookup
				// and this insert; undo our balance change and hand back the
				// winning row
				self.account_repo
					.apply_delta(conn, intent.account_id, -intent.amount_cents)?;
				let existing = self.refetch_winner(conn, &new)?;
				info!(
					"posting on account {} raced an identical request; returning transaction {}",
					intent.account_id, existing.id
				);
				Ok(Posting::Duplicate { existing })
			}
		}
	}

	/// Records a denied attempt for audit and reports the denial. A replayed
	/// key that already produced a row comes back as `Duplicate` instead.
	fn deny(&self, conn: &mut SqliteConnection, new: &NewTransaction, reason: DenyReason) -> Result<Posting> {
		debug!(
			"denying {} posting on account {}: {:?}",
			new.transaction_type, new.account_id, reason
		);

		let denied = NewTransaction {
			status: Status::Denied,
			..*new
		};
		match self.transaction_repo.insert(conn, &denied)? {
			InsertOutcome::Inserted(transaction) => Ok(Posting::Denied { transaction, reason }),
			InsertOutcome::Conflict => {
				let existing = self.refetch_winner(conn, &denied)?;
				Ok(Posting::Duplicate { existing })
			}
		}
	}

	fn refetch_winner(&self, conn: &mut SqliteConnection, new: &NewTransaction) -> Result<Transaction> {
		let key = new
			.idempotency_key
			.ok_or(Error::Database(db::Error::RecordAlreadyExists))?;
		self.transaction_repo
			.find_existing(conn, key, new)?
			.ok_or(Error::Database(db::Error::RecordAlreadyExists))
	}

	/// Two-leg (or deliberately one-leg) transfer inside an open transaction.
	/// The one-leg-vs-two-leg decision is the branch on `destination`.
	fn transfer_legs(
		&self,
		conn: &mut SqliteConnection,
		source_id: &str,
		destination: &Destination,
		amount_cents: Cents,
		transaction_type: Type,
		idempotency_key: Option<&str>,
		rule_id: Option<&str>,
	) -> Result<Transfer> {
		if amount_cents <= 0 {
			return Err(Error::InvalidAmount(format!(
				"transfer of {} cents",
				amount_cents
			)));
		}

		// validate the destination before the debit leg so an inactive
		// recipient denies cleanly instead of unwinding a half-posted transfer
		if let Destination::Resolved(destination_id) = destination {
			let destination_account = match self.account_repo.find_by_id(conn, destination_id) {
				Ok(account) => account,
				Err(db::Error::RecordNotFound) => {
					return Err(Error::AccountNotFound(destination_id.to_string()))
				}
				Err(e) => return Err(e.into()),
			};
			if !destination_account.is_active {
				let outbound = NewTransaction {
					account_id: source_id,
					amount_cents: -amount_cents,
					transaction_type,
					status: Status::Approved,
					idempotency_key,
					rule_id,
				};
				let posting = self.deny(conn, &outbound, DenyReason::InactiveAccount)?;
				return Ok(Transfer::from(posting));
			}
		}

		let debit = PostIntent {
			account_id: source_id,
			amount_cents: -amount_cents,
			transaction_type,
			idempotency_key,
			rule_id,
		};
		let outbound = match self.post_leg(conn, &debit)? {
			Posting::Approved { transaction } => transaction,
			other => return Ok(Transfer::from(other)),
		};

		let destination_id = match destination {
			Destination::Resolved(destination_id) => destination_id,
			Destination::Unresolved => {
				// black hole: the recipient is outside this ledger, so only
				// the outbound side is recorded
				return Ok(Transfer::Posted {
					outbound,
					inbound: None,
				});
			}
		};

		let credit = PostIntent {
			account_id: destination_id,
			amount_cents,
			transaction_type,
			idempotency_key,
			rule_id,
		};
		match self.post_leg(conn, &credit)? {
			Posting::Approved { transaction: inbound } => Ok(Transfer::Posted {
				outbound,
				inbound: Some(inbound),
			}),
			// the debit leg posted fresh, so a replayed credit leg means the
			// two sides disagree; roll the whole unit back
			_ => Err(Error::PartialReplay),
		}
	}
}

fn occurrence_key(rule_id: &str, occurrence: Time) -> String {
	format!("rule:{}:{}", rule_id, occurrence.format("%Y-%m-%dT%H:%M:%S"))
}
