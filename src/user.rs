use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::schema::users;
use crate::types::{new_id, now, Id, Time};

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
	pub id: Id,
	pub email: String,
	pub first_name: String,
	pub family_name: String,
	#[diesel(skip_insertion)]
	pub created_at: Time,
}

pub struct NewUser<'a> {
	pub email: &'a str,
	pub first_name: &'a str,
	pub family_name: &'a str,
}

pub enum UserKey<'a> {
	Id(&'a str),
	Email(&'a str),
}

/// Data store implementation for operating on users in the database
pub struct Repo;

impl Repo {
	pub fn new() -> Self {
		Repo
	}

	pub fn create(&self, conn: &mut SqliteConnection, new_user: NewUser) -> db::Result<User> {
		let user = User {
			id: new_id(),
			email: new_user.email.to_string(),
			first_name: new_user.first_name.to_string(),
			family_name: new_user.family_name.to_string(),
			created_at: now(),
		};

		diesel::insert_into(users::table)
			.values(&user)
			.returning(users::all_columns)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find(&self, conn: &mut SqliteConnection, key: UserKey) -> db::Result<User> {
		match key {
			UserKey::Id(id) => users::table.find(id).first::<User>(conn),
			UserKey::Email(email) => users::table
				.filter(users::email.eq(email))
				.first::<User>(conn),
		}
		.map_err(Into::into)
	}
}

impl Default for Repo {
	fn default() -> Self {
		Repo::new()
	}
}
