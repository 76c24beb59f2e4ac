use serde::{Deserialize, Serialize};
use time::Date;

pub const ADULT_FROM_YEARS: u32 = 18;
pub const SENIOR_FROM_YEARS: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
	Minor,
	Adult,
	Senior,
}
impl AgeGroup {
	pub const ALL: [Self; 3] = [Self::Minor, Self::Adult, Self::Senior];

	pub fn for_age(age: u32) -> Self {
		if age < ADULT_FROM_YEARS {
			Self::Minor
		} else if age < SENIOR_FROM_YEARS {
			Self::Adult
		} else {
			Self::Senior
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Minor => "minor",
			Self::Adult => "adult",
			Self::Senior => "senior",
		}
	}
}

/// Completed years between `birth` and `today`. Birth dates in the future count as zero.
pub fn age_on(birth: Date, today: Date) -> u32 {
	if birth >= today {
		return 0;
	}

	let mut years = today.year() - birth.year();

	if (today.month() as u8, today.day()) < (birth.month() as u8, birth.day()) {
		years -= 1;
	}

	years.max(0) as u32
}
