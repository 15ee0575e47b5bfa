use bank_core::db;
use bank_core::user::{NewUser, Repo, UserKey};

use crate::common::Fixture;

#[test]
fn create_and_find_with_either_key() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = Repo::new();

	let user = repo
		.create(
			conn,
			NewUser {
				email: "tom@gmail.com",
				first_name: "Tom",
				family_name: "Riddle",
			},
		)
		.unwrap();

	let by_id = repo.find(conn, UserKey::Id(&user.id)).unwrap();
	assert_eq!(by_id, user);

	let by_email = repo.find(conn, UserKey::Email("tom@gmail.com")).unwrap();
	assert_eq!(by_email, user);
}

#[test]
fn duplicate_email_is_rejected() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = Repo::new();

	f.user_factory.bob();
	let err = repo
		.create(
			conn,
			NewUser {
				email: "bob@gmail.com",
				first_name: "Other",
				family_name: "Bob",
			},
		)
		.unwrap_err();
	assert!(matches!(err, db::Error::RecordAlreadyExists), "got {:?}", err);
}

#[test]
fn find_missing_user_is_an_error() {
	let f = Fixture::new();
	let conn = &mut f.conn();
	let repo = Repo::new();

	let err = repo.find(conn, UserKey::Email("nobody@gmail.com")).unwrap_err();
	assert!(matches!(err, db::Error::RecordNotFound), "got {:?}", err);
}
