//! Transactional money-movement core for a banking application.
//!
//! Everything that mutates an account balance goes through [`bank::Service`],
//! which runs the idempotency guard, the conditional balance update, and the
//! ledger insert as one atomic unit and classifies the outcome as approved,
//! denied, or duplicate. Recurring bill-pay and transfer rules are scheduled
//! with [`schedule::next_occurrence`].

pub mod schema;

pub mod db;
pub mod money;
pub mod types;

pub mod account;
pub mod payee;
pub mod rule;
pub mod transaction;
pub mod user;

pub mod bank;
pub mod schedule;

#[cfg(test)]
mod testutil;

pub use bank::{DenyReason, Destination, NewService, PostIntent, Posting, Service, Transfer};
pub use money::{format_cents, parse_amount, Cents};
pub use types::{Id, Time};
