use time::{Date, OffsetDateTime};
use uuid::Uuid;

use nlq_domain::{DocumentType, Gender, PersonRecord};

use crate::Error;

/// A `personas` row as stored by the registry.
#[derive(Debug, sqlx::FromRow)]
pub struct PersonRow {
	pub id: i64,
	pub numero_documento: String,
	pub tipo_documento: String,
	pub primer_nombre: String,
	pub segundo_nombre: Option<String>,
	pub apellidos: String,
	pub fecha_nacimiento: Date,
	pub genero: String,
	pub correo_electronico: String,
	pub celular: String,
	pub foto_url: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<PersonRow> for PersonRecord {
	type Error = Error;

	fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
		let document_type = DocumentType::from_label(&row.tipo_documento).ok_or_else(|| {
			Error::InvalidRow(format!("Unknown tipo_documento for person {}.", row.id))
		})?;
		let gender = Gender::from_label(&row.genero)
			.ok_or_else(|| Error::InvalidRow(format!("Unknown genero for person {}.", row.id)))?;

		Ok(Self {
			id: row.id,
			document_number: row.numero_documento,
			document_type,
			first_name: row.primer_nombre,
			second_name: row.segundo_nombre,
			surnames: row.apellidos,
			birth_date: row.fecha_nacimiento,
			gender,
			email: row.correo_electronico,
			phone: row.celular,
			photo_url: row.foto_url,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmbeddingOutboxEntry {
	pub outbox_id: Uuid,
	pub person_id: i64,
	pub op: String,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
