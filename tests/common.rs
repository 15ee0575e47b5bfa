use tempfile::TempDir;

pub use bank_core::*;

use bank_core::money::Cents;
use bank_core::types::new_id;
use bank_core::user::NewUser;

/// Test fixture backed by a throwaway database file. Every fixture owns its
/// own database, so tests need no teardown and never see each other's rows.
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

	pub fn pool(&self) -> db::SqlitePool {
		self.pool.clone()
	}

	pub fn conn(&self) -> db::PooledConn {
		self.pool.get().unwrap()
	}
}

pub struct Suite {
	pub user_repo: user::Repo,
	pub account_repo: account::Repo,
	pub payee_repo: payee::Repo,
	pub rule_repo: rule::Repo,
	pub transaction_repo: transaction::Repo,
}

impl Suite {
	pub fn setup() -> Self {
		Suite {
			user_repo: user::Repo::new(),
			account_repo: account::Repo::new(),
			payee_repo: payee::Repo::new(),
			rule_repo: rule::Repo::new(),
			transaction_repo: transaction::Repo::new(),
		}
	}
}

#[test]
fn test_suite_setup() {
	let fixture = Fixture::new();
	let _suite = Suite::setup();
	let _conn = fixture.conn();
}

pub struct UserFactory {
	pool: db::SqlitePool,
}

impl UserFactory {
	fn new(pool: db::SqlitePool) -> Self {
		UserFactory { pool }
	}

	pub fn user(&self, new_user: NewUser) -> user::User {
		let conn = &mut self.pool.get().unwrap();
		user::Repo::new().create(conn, new_user).unwrap()
	}

	pub fn bob(&self) -> user::User {
		self.user(NewUser {
			email: "bob@gmail.com",
			first_name: "Bob",
			family_name: "Roberts",
		})
	}

	pub fn lucy(&self) -> user::User {
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

	pub fn checking_account(&self, user_id: &str, opening_cents: Cents) -> account::Account {
		let conn = &mut self.pool.get().unwrap();
		let account_number = format!("CHK-{}", &new_id()[..8]);
		account::Repo::new()
			.open(
				conn,
				account::NewAccount {
					user_id,
					account_number: &account_number,
					opening_cents,
				},
			)
			.unwrap()
	}
}
