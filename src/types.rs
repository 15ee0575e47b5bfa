use chrono::{NaiveDateTime, Utc};

pub type Id = String;
pub type Time = NaiveDateTime;

/// Fresh identifier for a persisted record.
pub fn new_id() -> Id {
	uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time, UTC.
pub fn now() -> Time {
	Utc::now().naive_utc()
}
