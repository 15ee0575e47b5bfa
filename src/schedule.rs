use chrono::{Duration, Months};

use crate::rule::Frequency;
use crate::types::Time;

/// Next occurrence of a schedule strictly after `now_at`.
///
/// Walks forward from `start_at` one period at a time, so occurrences missed
/// while the system was down are skipped rather than replayed, and the grid
/// stays anchored to the original start (a weekly rule started on a Monday
/// always lands on Mondays).
pub fn next_occurrence(start_at: Time, frequency: Frequency, now_at: Time) -> Time {
	let mut next = start_at;
	while next <= now_at {
		next = advance(next, frequency);
	}
	next
}

/// [`next_occurrence`] bounded by the rule's optional end: `None` once the
/// schedule has lapsed past `end_at`.
pub fn next_run(start_at: Time, frequency: Frequency, end_at: Option<Time>, now_at: Time) -> Option<Time> {
	let next = next_occurrence(start_at, frequency, now_at);
	match end_at {
		Some(end) if next > end => None,
		_ => Some(next),
	}
}

fn advance(at: Time, frequency: Frequency) -> Time {
	match frequency {
		Frequency::Weekly => at + Duration::days(7),
		Frequency::Biweekly => at + Duration::days(14),
		Frequency::Monthly => at + Months::new(1),
		Frequency::Quarterly => at + Months::new(3),
		Frequency::Yearly => at + Months::new(12),
	}
}
