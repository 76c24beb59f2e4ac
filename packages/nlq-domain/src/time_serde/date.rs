use serde::{Deserialize as _, Deserializer, Serializer};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(ISO_DATE).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	Date::parse(raw.trim(), ISO_DATE).map_err(serde::de::Error::custom)
}

pub fn format(value: Date) -> String {
	value.format(ISO_DATE).unwrap_or_else(|_| value.to_string())
}
