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
use crate::schedule;
use crate::schema::recurring_rules;
use crate::types::{new_id, now, Id, Time};

/// A scheduled bill payment or recurring transfer.
///
/// Exactly one of `payee_id` (bill pay) and `destination_account_id`
/// (recurring transfer) is set. `next_run_at` is null once the schedule has
/// lapsed past `end_at`.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = recurring_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecurringRule {
	pub id: Id,
	pub user_id: Id,
	pub account_id: Id,
	pub payee_id: Option<Id>,
	pub destination_account_id: Option<Id>,
	pub amount_cents: Cents,
	pub frequency: Frequency,
	pub start_at: Time,
	pub end_at: Option<Time>,
	pub next_run_at: Option<Time>,
	pub is_active: bool,
	#[diesel(skip_insertion)]
	pub created_at: Time,
}

#[derive(AsExpression, FromSqlRow, Copy, Clone, Eq, PartialEq, EnumString, Display, Serialize, Deserialize, Debug)]
#[diesel(sql_type = Text)]
#[strum(serialize_all = "snake_case")]
pub enum Frequency {
	Weekly,
	Biweekly,
	Monthly,
	Quarterly,
	Yearly,
}

impl ToSql<Text, Sqlite> for Frequency {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		out.set_value(self.to_string());
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for Frequency {
	fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
		Frequency::from_str(&s).map_err(|_| format!("unrecognized frequency: {}", s).into())
	}
}

pub struct NewRule<'a> {
	pub user_id: &'a str,
	pub account_id: &'a str,
	pub payee_id: Option<&'a str>,
	pub destination_account_id: Option<&'a str>,
	pub amount_cents: Cents,
	pub frequency: Frequency,
	pub start_at: Time,
	pub end_at: Option<Time>,
}

/// Data store implementation for operating on recurring rules in the database
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	/// Creates the rule and stamps its first `next_run_at` relative to `now`.
	pub fn create(&self, conn: &mut SqliteConnection, new_rule: NewRule, now_at: Time) -> db::Result<RecurringRule> {
		let next_run_at = schedule::next_run(new_rule.start_at, new_rule.frequency, new_rule.end_at, now_at);
		let rule = RecurringRule {
			id: new_id(),
			user_id: new_rule.user_id.to_string(),
			account_id: new_rule.account_id.to_string(),
			payee_id: new_rule.payee_id.map(str::to_string),
			destination_account_id: new_rule.destination_account_id.map(str::to_string),
			amount_cents: new_rule.amount_cents,
			frequency: new_rule.frequency,
			start_at: new_rule.start_at,
			end_at: new_rule.end_at,
			next_run_at,
			is_active: true,
			created_at: now(),
		};

		diesel::insert_into(recurring_rules::table)
			.values(&rule)
			.returning(recurring_rules::all_columns)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, conn: &mut SqliteConnection, rule_id: &str) -> db::Result<RecurringRule> {
		recurring_rules::table
			.find(rule_id)
			.first::<RecurringRule>(conn)
			.map_err(Into::into)
	}

	pub fn find_for_user(&self, conn: &mut SqliteConnection, user_id: &str) -> db::Result<Vec<RecurringRule>> {
		recurring_rules::table
			.filter(recurring_rules::user_id.eq(user_id))
			.order(recurring_rules::created_at.asc())
			.load::<RecurringRule>(conn)
			.map_err(Into::into)
	}

	/// Active rules whose next occurrence is due at or before `now_at`. The
	/// external driver feeds these to [`crate::bank::Service::execute_rule`].
	pub fn list_due(&self, conn: &mut SqliteConnection, now_at: Time) -> db::Result<Vec<RecurringRule>> {
		recurring_rules::table
			.filter(recurring_rules::is_active.eq(true))
			.filter(recurring_rules::next_run_at.le(now_at))
			.order(recurring_rules::next_run_at.asc())
			.load::<RecurringRule>(conn)
			.map_err(Into::into)
	}

	/// Changes the frequency and recomputes `next_run_at` from the rule's
	/// original start time, not from `now_at`, so the schedule grid stays
	/// anchored (a weekly Monday rule stays on Mondays).
	pub fn set_frequency(
		&self,
		conn: &mut SqliteConnection,
		rule_id: &str,
		frequency: Frequency,
		now_at: Time,
	) -> db::Result<RecurringRule> {
		let rule = self.find_by_id(conn, rule_id)?;
		let next_run_at = schedule::next_run(rule.start_at, frequency, rule.end_at, now_at);

		diesel::update(recurring_rules::table.filter(recurring_rules::id.eq(rule_id)))
			.set((
				recurring_rules::frequency.eq(frequency),
				recurring_rules::next_run_at.eq(next_run_at),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Moves `next_run_at` past `now_at` after a firing, nulling it once the
	/// schedule lapses past `end_at`.
	pub fn advance(&self, conn: &mut SqliteConnection, rule_id: &str, now_at: Time) -> db::Result<RecurringRule> {
		let rule = self.find_by_id(conn, rule_id)?;
		let next_run_at = schedule::next_run(rule.start_at, rule.frequency, rule.end_at, now_at);

		diesel::update(recurring_rules::table.filter(recurring_rules::id.eq(rule_id)))
			.set(recurring_rules::next_run_at.eq(next_run_at))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn deactivate(&self, conn: &mut SqliteConnection, rule_id: &str) -> db::Result<RecurringRule> {
		diesel::update(recurring_rules::table.filter(recurring_rules::id.eq(rule_id)))
			.set(recurring_rules::is_active.eq(false))
			.get_result(conn)
			.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
