use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::schema::payees;
use crate::types::{new_id, now, Id, Time};

/// A bill-pay destination. Payees are shared across users and are never
/// validated against a real external bank.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = payees)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Payee {
	pub id: Id,
	pub name: String,
	pub address: Option<String>,
	pub account_number: String,
	pub routing_number: String,
	pub is_active: bool,
	#[diesel(skip_insertion)]
	pub created_at: Time,
}

pub struct NewPayee<'a> {
	pub name: &'a str,
	pub address: Option<&'a str>,
	pub account_number: &'a str,
	pub routing_number: &'a str,
}

/// Data store implementation for operating on payees in the database
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	/// Idempotent creation by the payee's natural key: re-submitting the same
	/// (routing number, account number) pair returns the existing payee.
	pub fn find_or_create(&self, conn: &mut SqliteConnection, new_payee: NewPayee) -> db::Result<Payee> {
		if let Some(existing) =
			self.find_by_destination(conn, new_payee.routing_number, new_payee.account_number)?
		{
			return Ok(existing);
		}

		let payee = Payee {
			id: new_id(),
			name: new_payee.name.to_string(),
			address: new_payee.address.map(str::to_string),
			account_number: new_payee.account_number.to_string(),
			routing_number: new_payee.routing_number.to_string(),
			is_active: true,
			created_at: now(),
		};

		match diesel::insert_into(payees::table)
			.values(&payee)
			.returning(payees::all_columns)
			.get_result(conn)
			.map_err(db::Error::from)
		{
			Ok(payee) => Ok(payee),
			// lost a race to an identical submission; the winner's row is
			// the answer
			Err(db::Error::RecordAlreadyExists) => self
				.find_by_destination(conn, new_payee.routing_number, new_payee.account_number)?
				.ok_or(db::Error::RecordNotFound),
			Err(e) => Err(e),
		}
	}

	pub fn find_by_id(&self, conn: &mut SqliteConnection, payee_id: &str) -> db::Result<Payee> {
		payees::table
			.find(payee_id)
			.first::<Payee>(conn)
			.map_err(Into::into)
	}

	pub fn find_by_destination(
		&self,
		conn: &mut SqliteConnection,
		routing_number: &str,
		account_number: &str,
	) -> db::Result<Option<Payee>> {
		payees::table
			.filter(payees::routing_number.eq(routing_number))
			.filter(payees::account_number.eq(account_number))
			.first::<Payee>(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn deactivate(&self, conn: &mut SqliteConnection, payee_id: &str) -> db::Result<Payee> {
		diesel::update(payees::table.filter(payees::id.eq(payee_id)))
			.set(payees::is_active.eq(false))
			.get_result(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
