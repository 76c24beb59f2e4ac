use sqlx::{Postgres, QueryBuilder};

use nlq_domain::{PersonFilter, PersonRecord};

use crate::{Result, db::Db, models::PersonRow};

const PERSON_COLUMNS: &str = "\
id,
	numero_documento,
	tipo_documento,
	primer_nombre,
	segundo_nombre,
	apellidos,
	fecha_nacimiento,
	genero,
	correo_electronico,
	celular,
	foto_url,
	created_at,
	updated_at";

/// New registry entry. The registry assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPerson {
	pub document_number: String,
	pub document_type: nlq_domain::DocumentType,
	pub first_name: String,
	pub second_name: Option<String>,
	pub surnames: String,
	pub birth_date: time::Date,
	pub gender: nlq_domain::Gender,
	pub email: String,
	pub phone: String,
	pub photo_url: Option<String>,
}

pub async fn insert_person(db: &Db, person: &NewPerson) -> Result<PersonRecord> {
	let sql = format!(
		"\
INSERT INTO personas (
	numero_documento,
	tipo_documento,
	primer_nombre,
	segundo_nombre,
	apellidos,
	fecha_nacimiento,
	genero,
	correo_electronico,
	celular,
	foto_url
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
RETURNING {PERSON_COLUMNS}"
	);
	let row: PersonRow = sqlx::query_as(&sql)
		.bind(person.document_number.as_str())
		.bind(person.document_type.label())
		.bind(person.first_name.as_str())
		.bind(person.second_name.as_deref())
		.bind(person.surnames.as_str())
		.bind(person.birth_date)
		.bind(person.gender.label())
		.bind(person.email.as_str())
		.bind(person.phone.as_str())
		.bind(person.photo_url.as_deref())
		.fetch_one(&db.pool)
		.await?;

	row.try_into()
}

pub async fn delete_person(db: &Db, id: i64) -> Result<bool> {
	let result = sqlx::query("DELETE FROM personas WHERE id = $1").bind(id).execute(&db.pool).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn fetch_person(db: &Db, id: i64) -> Result<Option<PersonRecord>> {
	let sql = format!("SELECT {PERSON_COLUMNS} FROM personas WHERE id = $1");
	let row: Option<PersonRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&db.pool).await?;

	row.map(PersonRecord::try_from).transpose()
}

/// Fetches every id that still exists. Order is unspecified; callers re-order.
pub async fn fetch_persons_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<PersonRecord>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!("SELECT {PERSON_COLUMNS} FROM personas WHERE id = ANY($1)");
	let rows: Vec<PersonRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&db.pool).await?;

	rows.into_iter().map(PersonRecord::try_from).collect()
}

pub async fn list_persons(db: &Db, filter: &PersonFilter) -> Result<Vec<PersonRecord>> {
	let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {PERSON_COLUMNS} FROM personas"));

	push_filter(&mut builder, filter);
	builder.push(" ORDER BY id ASC");

	let rows: Vec<PersonRow> = builder.build_query_as().fetch_all(&db.pool).await?;

	rows.into_iter().map(PersonRecord::try_from).collect()
}

pub async fn count_persons(db: &Db, filter: &PersonFilter) -> Result<u64> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT count(*) FROM personas");

	push_filter(&mut builder, filter);

	let count: i64 = builder.build_query_scalar().fetch_one(&db.pool).await?;

	Ok(count.max(0) as u64)
}

// Values only ever reach the statement as bind parameters.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PersonFilter) {
	let mut prefix = " WHERE ";

	if let Some(gender) = filter.gender {
		builder.push(prefix).push("genero = ").push_bind(gender.label());

		prefix = " AND ";
	}
	if let Some(document_type) = filter.document_type {
		builder.push(prefix).push("tipo_documento = ").push_bind(document_type.label());
	}
}
