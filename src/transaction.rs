use std::str::FromStr;

use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::db;
use crate::money::Cents;
use crate::schema::transactions;
use crate::types::{new_id, now, Id, Time};

/// A single immutable ledger row. Denied attempts are recorded too, for
/// audit; rows are never updated after creation.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Transaction {
	pub id: Id,
	pub account_id: Id,
	/// Positive = inbound credit, negative = outbound debit.
	pub amount_cents: Cents,
	pub transaction_type: Type,
	pub direction: Direction,
	pub status: Status,
	pub idempotency_key: Option<String>,
	/// Recurring rule that generated this posting, if any.
	pub rule_id: Option<Id>,
	#[diesel(skip_insertion)]
	pub created_at: Time,
}

#[derive(AsExpression, FromSqlRow, Copy, Clone, Eq, PartialEq, EnumString, Display, Serialize, Deserialize, Debug)]
#[diesel(sql_type = Text)]
#[strum(serialize_all = "snake_case")]
pub enum Type {
	Deposit,
	Withdrawal,
	InternalTransfer,
	ExternalTransfer,
	Billpay,
}

#[derive(AsExpression, FromSqlRow, Copy, Clone, Eq, PartialEq, EnumString, Display, Serialize, Deserialize, Debug)]
#[diesel(sql_type = Text)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
	Inbound,
	Outbound,
}

impl Direction {
	pub fn of(amount_cents: Cents) -> Direction {
		if amount_cents < 0 {
			Direction::Outbound
		} else {
			Direction::Inbound
		}
	}
}

#[derive(AsExpression, FromSqlRow, Copy, Clone, Eq, PartialEq, EnumString, Display, Serialize, Deserialize, Debug)]
#[diesel(sql_type = Text)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
	Approved,
	Denied,
}

impl ToSql<Text, Sqlite> for Type {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		out.set_value(self.to_string());
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for Type {
	fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
		Type::from_str(&s).map_err(|_| format!("unrecognized transaction type: {}", s).into())
	}
}

impl ToSql<Text, Sqlite> for Direction {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		out.set_value(self.to_string());
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for Direction {
	fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
		Direction::from_str(&s).map_err(|_| format!("unrecognized direction: {}", s).into())
	}
}

impl ToSql<Text, Sqlite> for Status {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		out.set_value(self.to_string());
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for Status {
	fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
		Status::from_str(&s).map_err(|_| format!("unrecognized status: {}", s).into())
	}
}

#[derive(Copy, Clone)]
pub struct NewTransaction<'a> {
	pub account_id: &'a str,
	pub amount_cents: Cents,
	pub transaction_type: Type,
	pub status: Status,
	pub idempotency_key: Option<&'a str>,
	pub rule_id: Option<&'a str>,
}

/// Result of a ledger insert. A collision on the idempotency index is a
/// normal outcome the poster branches on, not an error.
#[derive(Debug, PartialEq)]
pub enum InsertOutcome {
	Inserted(Transaction),
	Conflict,
}

/// Data store implementation for operating on ledger transactions in the database
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn insert(&self, conn: &mut SqliteConnection, new: &NewTransaction) -> db::Result<InsertOutcome> {
		use diesel::result::DatabaseErrorKind::UniqueViolation;
		use diesel::result::Error::DatabaseError;

		let row = Transaction {
			id: new_id(),
			account_id: new.account_id.to_string(),
			amount_cents: new.amount_cents,
			transaction_type: new.transaction_type,
			direction: Direction::of(new.amount_cents),
			status: new.status,
			idempotency_key: new.idempotency_key.map(str::to_string),
			rule_id: new.rule_id.map(str::to_string),
			created_at: now(),
		};

		match diesel::insert_into(transactions::table)
			.values(&row)
			.returning(transactions::all_columns)
			.get_result::<Transaction>(conn)
		{
			Ok(transaction) => Ok(InsertOutcome::Inserted(transaction)),
			Err(DatabaseError(UniqueViolation, _)) => Ok(InsertOutcome::Conflict),
			Err(e) => Err(e.into()),
		}
	}

	/// Idempotency guard lookup.
	///
	/// The key only matches together with every natural field of the
	/// attempted posting, so a colliding key with mismatched fields is never
	/// treated as the same logical operation. Status is deliberately ignored:
	/// a replayed intent gets the original outcome back, approved or denied.
	pub fn find_existing(
		&self,
		conn: &mut SqliteConnection,
		key: &str,
		new: &NewTransaction,
	) -> db::Result<Option<Transaction>> {
		let mut query = transactions::table
			.filter(transactions::idempotency_key.eq(key))
			.filter(transactions::account_id.eq(new.account_id))
			.filter(transactions::transaction_type.eq(new.transaction_type))
			.filter(transactions::amount_cents.eq(new.amount_cents))
			.into_boxed();

		query = match new.rule_id {
			Some(rule_id) => query.filter(transactions::rule_id.eq(rule_id)),
			None => query.filter(transactions::rule_id.is_null()),
		};

		query
			.first::<Transaction>(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut SqliteConnection, transaction_id: &str) -> db::Result<Transaction> {
		transactions::table
			.find(transaction_id)
			.first::<Transaction>(conn)
			.map_err(Into::into)
	}

	pub fn list_for_account(&self, conn: &mut SqliteConnection, account_id: &str) -> db::Result<Vec<Transaction>> {
		transactions::table
			.filter(transactions::account_id.eq(account_id))
			.order(transactions::created_at.desc())
			.load::<Transaction>(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
