use time::Date;

use crate::{person::PersonRecord, time_serde};

/// Builds the text that gets embedded for a person.
///
/// Field order and labels are fixed, so two calls over an unchanged record on the same day yield
/// the same text and the index can be re-synced idempotently. Age is derived from `today` rather
/// than stored.
pub fn person_summary(person: &PersonRecord, today: Date) -> String {
	let lines = [
		format!("Nombre: {}", person.full_name()),
		format!(
			"Documento: {} {}",
			person.document_type.label(),
			person.document_number.trim()
		),
		format!("Fecha de nacimiento: {}", time_serde::date::format(person.birth_date)),
		format!("Edad: {} años", person.age_on(today)),
		format!("Género: {}", person.gender.label()),
		format!("Email: {}", person.email.trim()),
		format!("Celular: {}", person.phone.trim()),
	];

	lines.join("\n")
}
