use time::{
	Date,
	macros::{date, datetime},
};

use nlq_domain::{DocumentType, Gender, PersonFilter, PersonRecord, person_summary};

fn sample_person() -> PersonRecord {
	PersonRecord {
		id: 7,
		document_number: "1020304050".to_string(),
		document_type: DocumentType::CitizenId,
		first_name: "Laura".to_string(),
		second_name: Some("  ".to_string()),
		surnames: "Gómez Rivera".to_string(),
		birth_date: date!(1990 - 04 - 12),
		gender: Gender::Female,
		email: "laura@example.com".to_string(),
		phone: "3001234567".to_string(),
		photo_url: None,
		created_at: datetime!(2024-01-01 0:00 UTC),
		updated_at: datetime!(2024-01-01 0:00 UTC),
	}
}

fn today() -> Date {
	date!(2026 - 10 - 18)
}

#[test]
fn summary_uses_fixed_field_order() {
	let summary = person_summary(&sample_person(), today());
	let lines: Vec<&str> = summary.lines().collect();

	assert_eq!(
		lines,
		vec![
			"Nombre: Laura Gómez Rivera",
			"Documento: Cédula 1020304050",
			"Fecha de nacimiento: 1990-04-12",
			"Edad: 36 años",
			"Género: Femenino",
			"Email: laura@example.com",
			"Celular: 3001234567",
		]
	);
}

#[test]
fn summary_is_stable_for_unchanged_records() {
	let person = sample_person();

	assert_eq!(person_summary(&person, today()), person_summary(&person.clone(), today()));
}

#[test]
fn summary_changes_when_a_source_field_changes() {
	let person = sample_person();
	let mut renamed = person.clone();

	renamed.surnames = "Gómez Duarte".to_string();

	assert_ne!(person_summary(&person, today()), person_summary(&renamed, today()));
}

#[test]
fn full_name_skips_blank_second_name() {
	let mut person = sample_person();

	assert_eq!(person.full_name(), "Laura Gómez Rivera");

	person.second_name = Some("Marcela".to_string());

	assert_eq!(person.full_name(), "Laura Marcela Gómez Rivera");
}

#[test]
fn labels_parse_case_and_accent_insensitively() {
	assert_eq!(Gender::from_label("femenino"), Some(Gender::Female));
	assert_eq!(Gender::from_label("NO BINARIO"), Some(Gender::NonBinary));
	assert_eq!(Gender::from_label("robot"), None);
	assert_eq!(DocumentType::from_label("cedula"), Some(DocumentType::CitizenId));
	assert_eq!(DocumentType::from_label("Tarjeta de Identidad"), Some(DocumentType::IdentityCard));

	for gender in Gender::ALL {
		assert_eq!(Gender::from_label(gender.label()), Some(gender));
	}
	for document_type in DocumentType::ALL {
		assert_eq!(DocumentType::from_label(document_type.label()), Some(document_type));
	}
}

#[test]
fn person_serializes_with_registry_labels_and_iso_dates() {
	let value = serde_json::to_value(sample_person()).expect("Failed to serialize person.");

	assert_eq!(value["document_type"], "Cédula");
	assert_eq!(value["gender"], "Femenino");
	assert_eq!(value["birth_date"], "1990-04-12");
	assert_eq!(value["created_at"], "2024-01-01T00:00:00Z");

	let parsed: PersonRecord =
		serde_json::from_value(value).expect("Failed to deserialize person.");

	assert_eq!(parsed, sample_person());
}

#[test]
fn filter_keys_follow_set_predicates() {
	let person = sample_person();
	let empty = PersonFilter::default();

	assert!(empty.is_empty());
	assert!(empty.matches(&person));
	assert!(empty.keys().is_empty());

	let filter = PersonFilter {
		gender: Some(Gender::Female),
		document_type: Some(DocumentType::IdentityCard),
	};

	assert_eq!(filter.keys(), vec!["gender", "document_type"]);
	assert!(!filter.matches(&person));
	assert!(PersonFilter { gender: Some(Gender::Female), document_type: None }.matches(&person));
}
