use serde::{Deserialize, Serialize};

use crate::person::{DocumentType, Gender, PersonRecord};

pub const GENDER_KEY: &str = "gender";
pub const DOCUMENT_TYPE_KEY: &str = "document_type";

/// The only predicates a registry query may apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gender: Option<Gender>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub document_type: Option<DocumentType>,
}
impl PersonFilter {
	pub fn is_empty(&self) -> bool {
		self.gender.is_none() && self.document_type.is_none()
	}

	pub fn matches(&self, person: &PersonRecord) -> bool {
		self.gender.is_none_or(|gender| person.gender == gender)
			&& self.document_type.is_none_or(|document_type| person.document_type == document_type)
	}

	/// Keys of the filters that are set, in a fixed order.
	pub fn keys(&self) -> Vec<&'static str> {
		let mut keys = Vec::new();

		if self.gender.is_some() {
			keys.push(GENDER_KEY);
		}
		if self.document_type.is_some() {
			keys.push(DOCUMENT_TYPE_KEY);
		}

		keys
	}
}
