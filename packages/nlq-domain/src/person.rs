use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::label::fold_label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
	#[serde(rename = "Masculino")]
	Male,
	#[serde(rename = "Femenino")]
	Female,
	#[serde(rename = "No binario")]
	NonBinary,
	#[serde(rename = "Prefiero no reportar")]
	Undisclosed,
}
impl Gender {
	pub const ALL: [Self; 4] = [Self::Male, Self::Female, Self::NonBinary, Self::Undisclosed];

	/// The label stored by the registry.
	pub fn label(self) -> &'static str {
		match self {
			Self::Male => "Masculino",
			Self::Female => "Femenino",
			Self::NonBinary => "No binario",
			Self::Undisclosed => "Prefiero no reportar",
		}
	}

	/// Accepts registry labels and a few common aliases, ignoring case and accents.
	pub fn from_label(raw: &str) -> Option<Self> {
		match fold_label(raw).as_str() {
			"masculino" | "male" | "hombre" | "hombres" | "m" => Some(Self::Male),
			"femenino" | "female" | "mujer" | "mujeres" | "f" => Some(Self::Female),
			"no binario" | "non binary" | "nonbinary" => Some(Self::NonBinary),
			"prefiero no reportar" | "undisclosed" | "prefer not to say" => Some(Self::Undisclosed),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
	#[serde(rename = "Tarjeta de identidad")]
	IdentityCard,
	#[serde(rename = "Cédula")]
	CitizenId,
}
impl DocumentType {
	pub const ALL: [Self; 2] = [Self::IdentityCard, Self::CitizenId];

	pub fn label(self) -> &'static str {
		match self {
			Self::IdentityCard => "Tarjeta de identidad",
			Self::CitizenId => "Cédula",
		}
	}

	pub fn from_label(raw: &str) -> Option<Self> {
		match fold_label(raw).as_str() {
			"tarjeta de identidad" | "tarjeta identidad" | "ti" | "identity card" =>
				Some(Self::IdentityCard),
			"cedula" | "cedula de ciudadania" | "cc" | "citizen id" => Some(Self::CitizenId),
			_ => None,
		}
	}
}

/// A registry row as the query engine sees it. The registry owns every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
	pub id: i64,
	pub document_number: String,
	pub document_type: DocumentType,
	pub first_name: String,
	pub second_name: Option<String>,
	pub surnames: String,
	#[serde(with = "crate::time_serde::date")]
	pub birth_date: Date,
	pub gender: Gender,
	pub email: String,
	pub phone: String,
	pub photo_url: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl PersonRecord {
	pub fn full_name(&self) -> String {
		let mut parts = vec![self.first_name.trim()];

		if let Some(second) = self.second_name.as_deref().map(str::trim)
			&& !second.is_empty()
		{
			parts.push(second);
		}

		parts.push(self.surnames.trim());
		parts.retain(|part| !part.is_empty());

		parts.join(" ")
	}

	pub fn age_on(&self, today: Date) -> u32 {
		crate::age::age_on(self.birth_date, today)
	}
}
