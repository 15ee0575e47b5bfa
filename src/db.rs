use std::env;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenv::dotenv;
use log::info;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Opens a pooled connection to the SQLite database at `database_url` and
/// brings the schema up to date.
///
/// The pool is the injected store handle: construct it once and pass it to
/// [`crate::bank::Service`] and the repos, so tests can substitute their own.
pub fn connect(database_url: &str) -> Result<SqlitePool> {
	let manager = ConnectionManager::<SqliteConnection>::new(database_url);
	let pool = Pool::builder()
		.max_size(8)
		.connection_customizer(Box::new(ConnectionCustomizer))
		.build(manager)
		.map_err(|e| Error::Connection(e.to_string()))?;

	run_migrations(&pool)?;
	Ok(pool)
}

/// [`connect`] with the database path taken from `DATABASE_URL`.
///
/// Loads a `.env` file in the working directory if one exists.
pub fn connect_from_env() -> Result<SqlitePool> {
	dotenv().ok();
	let database_url = env::var("DATABASE_URL")
		.map_err(|_| Error::Connection("DATABASE_URL must be set".to_string()))?;
	connect(&database_url)
}

fn run_migrations(pool: &SqlitePool) -> Result<()> {
	let mut conn = pool.get()?;
	let applied = conn
		.run_pending_migrations(MIGRATIONS)
		.map_err(|e| Error::Migration(e.to_string()))?;

	for version in &applied {
		info!("applied migration {}", version);
	}
	Ok(())
}

/// Write-ahead logging keeps concurrent readers off the writers' backs, and
/// the busy timeout queues writers instead of surfacing SQLITE_BUSY.
#[derive(Debug)]
struct ConnectionCustomizer;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
	fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
		conn.batch_execute(
			"PRAGMA journal_mode = WAL;
			PRAGMA foreign_keys = ON;
			PRAGMA busy_timeout = 30000;
			PRAGMA synchronous = NORMAL;",
		)
		.map_err(diesel::r2d2::Error::QueryError)
	}
}

/// Error that can occur when querying against the database
#[derive(Error, Debug)]
pub enum Error {
	#[error("record violates a unique constraint")]
	RecordAlreadyExists,
	#[error("record does not exist")]
	RecordNotFound,
	#[error("opening database connection: {0}")]
	Connection(String),
	#[error("running database migrations: {0}")]
	Migration(String),
	/// Catch-all for failures with no more specific classification.
	#[error("database error: {0}")]
	Database(diesel::result::Error),
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		use diesel::result::DatabaseErrorKind::UniqueViolation;
		use diesel::result::Error::{DatabaseError, NotFound};

		match e {
			DatabaseError(UniqueViolation, _) => Error::RecordAlreadyExists,
			NotFound => Error::RecordNotFound,
			_ => Error::Database(e),
		}
	}
}

impl From<r2d2::Error> for Error {
	fn from(e: r2d2::Error) -> Self {
		Error::Connection(e.to_string())
	}
}
