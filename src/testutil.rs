use tempfile::TempDir;

use crate::account::{Account, NewAccount, Repo as AccountRepo};
use crate::db;
use crate::money::Cents;
use crate::types::new_id;
use crate::user::{NewUser, Repo as UserRepo, User};

/// Test fixture backed by a throwaway database file. Every fixture gets its
/// own database, so tests need no teardown and cannot see each other.
pub struct Fixture {
	pub pool: db::SqlitePool,
	pub user_factory: UserFactory,
	pub account_factory: AccountFactory,
	_tmp: TempDir,
}

impl Fixture {
	pub fn new() -> Self {
		let tmp = TempDir::new().expect("create temp dir");
		let path = tmp.path().join("bank.db");
		let pool = db::connect(path.to_str().expect("utf-8 temp path")).expect("connect test db");

		Fixture {
			user_factory: UserFactory::new(pool.clone()),
			account_factory: AccountFactory::new(pool.clone()),
			pool,
			_tmp: tmp,
		}
	}

	pub fn conn(&self) -> db::PooledConn {
		self.pool.get().unwrap()
	}
}

pub struct UserFactory {
	pool: db::SqlitePool,
}

impl UserFactory {
	fn new(pool: db::SqlitePool) -> Self {
		UserFactory { pool }
	}

	pub fn user(&self, new_user: NewUser) -> User {
		let conn = &mut self.pool.get().unwrap();
		UserRepo::new().create(conn, new_user).unwrap()
	}

	pub fn bob(&self) -> User {
		self.user(NewUser {
			email: "bob@gmail.com",
			first_name: "Bob",
			family_name: "Roberts",
		})
	}

	pub fn lucy(&self) -> User {
		self.user(NewUser {
			email: "lucy@gmail.com",
			first_name: "Lucy",
			family_name: "Luke",
		})
	}
}

pub struct AccountFactory {
	pool: db::SqlitePool,
}

impl AccountFactory {
	pub fn new(pool: db::SqlitePool) -> Self {
		AccountFactory { pool }
	}

	pub fn checking_account(&self, user_id: &str, opening_cents: Cents) -> Account {
		let conn = &mut self.pool.get().unwrap();
		let account_number = format!("CHK-{}", &new_id()[..8]);
		AccountRepo::new()
			.open(
				conn,
				NewAccount {
					user_id,
					account_number: &account_number,
					opening_cents,
				},
			)
			.unwrap()
	}
}
