use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		DeletePointsBuilder, PointId, PointStruct, PointsIdsList, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Value, point_id::PointIdOptions,
	},
};
use time::Date;

use nlq_config::Query as QueryConfig;
use nlq_domain::{DocumentType, Gender, PersonRecord};
use nlq_storage::qdrant::QdrantStore;

use crate::{BoxFuture, Error, Result};

/// Denormalized snapshot stored next to each vector so hits can be shown without a registry read.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexPayload {
	pub person_id: i64,
	pub full_name: String,
	pub document_number: String,
	pub document_type: DocumentType,
	pub gender: Gender,
	pub age: u32,
	pub summary_hash: String,
}
impl IndexPayload {
	pub fn for_person(person: &PersonRecord, summary: &str, today: Date) -> Self {
		Self {
			person_id: person.id,
			full_name: person.full_name(),
			document_number: person.document_number.clone(),
			document_type: person.document_type,
			gender: person.gender,
			age: person.age_on(today),
			summary_hash: blake3::hash(summary.as_bytes()).to_hex().to_string(),
		}
	}
}

/// The derived index entry for one registry record.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingRecord {
	pub id: i64,
	pub vector: Vec<f32>,
	pub summary: String,
	pub payload: IndexPayload,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
	pub id: i64,
	/// Ordering signal only.
	pub score: f32,
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn ensure_collection(&self) -> BoxFuture<'_, Result<()>>;

	/// Overwrites any existing entry for `id`.
	fn upsert<'a>(
		&'a self,
		id: i64,
		vector: &'a [f32],
		payload: &'a IndexPayload,
	) -> BoxFuture<'a, Result<()>>;

	/// Best matches first.
	fn search<'a>(&'a self, vector: &'a [f32], k: u32) -> BoxFuture<'a, Result<Vec<SearchHit>>>;

	/// Deleting an absent id succeeds.
	fn delete(&self, id: i64) -> BoxFuture<'_, Result<()>>;
}

/// Number of neighbours to request: the caller's limit or the default, within `1..=max_k`.
pub fn clamp_k(requested: Option<u32>, cfg: &QueryConfig) -> u32 {
	requested.unwrap_or(cfg.default_k).clamp(1, cfg.max_k.max(1))
}

pub struct QdrantIndex {
	pub store: QdrantStore,
}
impl QdrantIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}
}
impl VectorIndex for QdrantIndex {
	fn ensure_collection(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			if self.store.ensure_collection().await? {
				tracing::info!(collection = %self.store.collection, "Created vector collection.");
			}

			Ok(())
		})
	}

	fn upsert<'a>(
		&'a self,
		id: i64,
		vector: &'a [f32],
		payload: &'a IndexPayload,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let point = PointStruct::new(point_id(id)?, vector.to_vec(), to_qdrant_payload(payload));
			let upsert =
				UpsertPointsBuilder::new(self.store.collection.clone(), vec![point]).wait(true);

			self.store.client.upsert_points(upsert).await?;

			Ok(())
		})
	}

	fn search<'a>(&'a self, vector: &'a [f32], k: u32) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			let search = QueryPointsBuilder::new(self.store.collection.clone())
				.query(Query::new_nearest(vector.to_vec()))
				.limit(k as u64)
				.with_payload(false);
			let response = self.store.client.query(search).await?;
			let hits = response
				.result
				.into_iter()
				.filter_map(|point| {
					let id = point.id.as_ref().and_then(point_id_to_i64)?;

					Some(SearchHit { id, score: point.score })
				})
				.collect();

			Ok(hits)
		})
	}

	fn delete(&self, id: i64) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let delete = DeletePointsBuilder::new(self.store.collection.clone())
				.points(PointsIdsList { ids: vec![point_id(id)?] })
				.wait(true);

			self.store.client.delete_points(delete).await?;

			Ok(())
		})
	}
}

fn point_id(id: i64) -> Result<PointId> {
	let id = u64::try_from(id).map_err(|_| Error::InvalidInput {
		message: "Person id must be non-negative.".to_string(),
	})?;

	Ok(PointId::from(id))
}

fn point_id_to_i64(point_id: &PointId) -> Option<i64> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Num(id)) => i64::try_from(*id).ok(),
		_ => None,
	}
}

fn to_qdrant_payload(payload: &IndexPayload) -> Payload {
	Payload::from(payload_map(payload))
}

fn payload_map(payload: &IndexPayload) -> HashMap<String, Value> {
	let mut map = HashMap::new();

	map.insert("person_id".to_string(), Value::from(payload.person_id));
	map.insert("nombre_completo".to_string(), Value::from(payload.full_name.clone()));
	map.insert("numero_documento".to_string(), Value::from(payload.document_number.clone()));
	map.insert(
		"tipo_documento".to_string(),
		Value::from(payload.document_type.label().to_string()),
	);
	map.insert("genero".to_string(), Value::from(payload.gender.label().to_string()));
	map.insert("edad".to_string(), Value::from(payload.age as i64));
	map.insert("summary_hash".to_string(), Value::from(payload.summary_hash.clone()));

	map
}
