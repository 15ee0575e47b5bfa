use bank_core::account::DeltaOutcome;
use bank_core::db;

use crate::common::Fixture;

#[test]
fn open_and_find() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let checking = f.account_factory.checking_account(&bob.id, 100_00);

	let by_id = repo.find_by_id(conn, &checking.id).unwrap();
	assert_eq!(by_id, checking);

	let by_number = repo.find_by_number(conn, &checking.account_number).unwrap();
	assert_eq!(by_number, checking);

	assert!(by_id.is_active);
	assert_eq!(by_id.balance_cents, 100_00);
}

#[test]
fn find_for_user_lists_all_accounts() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let first = f.account_factory.checking_account(&bob.id, 0);
	let second = f.account_factory.checking_account(&bob.id, 0);

	let lucy = f.user_factory.lucy();
	f.account_factory.checking_account(&lucy.id, 0);

	let got = repo.find_for_user(conn, &bob.id).unwrap();
	assert_eq!(got.len(), 2);
	assert!(got.contains(&first));
	assert!(got.contains(&second));
}

#[test]
fn credit_and_covered_debit_apply() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let checking = f.account_factory.checking_account(&bob.id, 0);

	let got = repo.apply_delta(conn, &checking.id, 500_00).unwrap();
	let DeltaOutcome::Applied(account) = got else {
		panic!("expected the credit to apply, got {:?}", got);
	};
	assert_eq!(account.balance_cents, 500_00);

	let got = repo.apply_delta(conn, &checking.id, -200_00).unwrap();
	let DeltaOutcome::Applied(account) = got else {
		panic!("expected the debit to apply, got {:?}", got);
	};
	assert_eq!(account.balance_cents, 300_00);
}

#[test]
fn uncovered_debit_is_not_applied() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let checking = f.account_factory.checking_account(&bob.id, 100_00);

	let got = repo.apply_delta(conn, &checking.id, -150_00).unwrap();
	assert_eq!(got, DeltaOutcome::NotApplied);

	let checking = repo.find_by_id(conn, &checking.id).unwrap();
	assert_eq!(checking.balance_cents, 100_00);
}

#[test]
fn debit_to_exactly_zero_applies() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let checking = f.account_factory.checking_account(&bob.id, 100_00);

	let got = repo.apply_delta(conn, &checking.id, -100_00).unwrap();
	let DeltaOutcome::Applied(account) = got else {
		panic!("expected the debit to apply, got {:?}", got);
	};
	assert_eq!(account.balance_cents, 0);
}

#[test]
fn delta_on_a_missing_account_is_an_error() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let err = repo.apply_delta(conn, "no-such-account", 100_00).unwrap_err();
	assert!(matches!(err, db::Error::RecordNotFound), "got {:?}", err);
}

#[test]
fn deactivate_keeps_the_row() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = bank_core::account::Repo::new();

	let bob = f.user_factory.bob();
	let checking = f.account_factory.checking_account(&bob.id, 100_00);

	let got = repo.deactivate(conn, &checking.id).unwrap();
	assert!(!got.is_active);
	assert_eq!(got.balance_cents, 100_00);
}
