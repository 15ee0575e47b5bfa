use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::money::Cents;
use crate::schema::accounts;
use crate::types::{new_id, now, Id, Time};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Account {
	pub id: Id,
	pub user_id: Id,
	/// Externally visible, unique account number.
	pub account_number: String,
	pub balance_cents: Cents,
	pub is_active: bool,
	#[diesel(skip_insertion)]
	pub created_at: Time,
}

pub struct NewAccount<'a> {
	pub user_id: &'a str,
	pub account_number: &'a str,
	pub opening_cents: Cents,
}

/// Outcome of a conditional balance change.
#[derive(Debug, PartialEq)]
pub enum DeltaOutcome {
	Applied(Account),
	/// The account exists but its balance does not cover the debit.
	NotApplied,
}

/// Data store implementation for operating on accounts in the database
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn open(&self, conn: &mut SqliteConnection, new_account: NewAccount) -> db::Result<Account> {
		let account = Account {
			id: new_id(),
			user_id: new_account.user_id.to_string(),
			account_number: new_account.account_number.to_string(),
			balance_cents: new_account.opening_cents,
			is_active: true,
			created_at: now(),
		};

		diesel::insert_into(accounts::table)
			.values(&account)
			.returning(accounts::all_columns)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut SqliteConnection, account_id: &str) -> db::Result<Account> {
		accounts::table
			.find(account_id)
			.first::<Account>(conn)
			.map_err(Into::into)
	}

	pub fn find_by_number(&self, conn: &mut SqliteConnection, account_number: &str) -> db::Result<Account> {
		accounts::table
			.filter(accounts::account_number.eq(account_number))
			.first::<Account>(conn)
			.map_err(Into::into)
	}

	pub fn find_for_user(&self, conn: &mut SqliteConnection, user_id: &str) -> db::Result<Vec<Account>> {
		accounts::table
			.filter(accounts::user_id.eq(user_id))
			.order(accounts::created_at.asc())
			.load::<Account>(conn)
			.map_err(Into::into)
	}

	/// Applies a signed delta to the account balance.
	///
	/// Credits always apply. Debits are issued as a single conditional update
	/// that matches only while the balance covers the magnitude, so two
	/// concurrent debits cannot jointly overdraw the account and no
	/// application-level lock is needed.
	pub fn apply_delta(&self, conn: &mut SqliteConnection, account_id: &str, delta: Cents) -> db::Result<DeltaOutcome> {
		let updated: Option<Account> = if delta >= 0 {
			diesel::update(accounts::table.filter(accounts::id.eq(account_id)))
				.set(accounts::balance_cents.eq(accounts::balance_cents + delta))
				.get_result(conn)
				.optional()?
		} else {
			diesel::update(
				accounts::table
					.filter(accounts::id.eq(account_id))
					.filter(accounts::balance_cents.ge(-delta)),
			)
			.set(accounts::balance_cents.eq(accounts::balance_cents + delta))
			.get_result(conn)
			.optional()?
		};

		match updated {
			Some(account) => Ok(DeltaOutcome::Applied(account)),
			None => {
				// zero rows matched: tell a missing account apart from an
				// uncovered debit
				self.find_by_id(conn, account_id)?;
				Ok(DeltaOutcome::NotApplied)
			}
		}
	}

	/// Accounts referenced by transactions are never deleted, only closed.
	pub fn deactivate(&self, conn: &mut SqliteConnection, account_id: &str) -> db::Result<Account> {
		diesel::update(accounts::table.filter(accounts::id.eq(account_id)))
			.set(accounts::is_active.eq(false))
			.get_result(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
