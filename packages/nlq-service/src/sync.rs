use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tokio::{sync::Semaphore, task::JoinSet};

use nlq_config::{SYNC_MODE_INLINE, SYNC_MODE_OUTBOX};
use nlq_domain::{PersonFilter, PersonRecord, person_summary};

use crate::{EmbeddingRecord, Error, IndexPayload, NlqService, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOp {
	Upsert,
	Delete,
}
impl SyncOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Upsert => nlq_storage::outbox::OP_UPSERT,
			Self::Delete => nlq_storage::outbox::OP_DELETE,
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			nlq_storage::outbox::OP_UPSERT => Some(Self::Upsert),
			nlq_storage::outbox::OP_DELETE => Some(Self::Delete),
			_ => None,
		}
	}
}

/// Registry change reported by the CRUD side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEvent {
	Created,
	Updated,
	Deleted,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NotifyRequest {
	pub event: ChangeEvent,
	pub person_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotifyResponse {
	pub person_id: i64,
	pub op: SyncOp,
	pub mode: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
	pub total: u64,
	pub succeeded: u64,
	pub failed: u64,
}

impl NlqService {
	/// Embeds the record's summary and overwrites its index entry.
	///
	/// Nothing is written when the embedding call fails.
	pub async fn upsert_embedding(&self, person: &PersonRecord) -> Result<EmbeddingRecord> {
		self.upsert_embedding_on(person, OffsetDateTime::now_utc().date()).await
	}

	pub async fn upsert_embedding_on(
		&self,
		person: &PersonRecord,
		today: Date,
	) -> Result<EmbeddingRecord> {
		let summary = person_summary(person, today);
		let vector = self.embed_one(&summary).await?;
		let payload = IndexPayload::for_person(person, &summary, today);

		self.index_call(self.index.upsert(person.id, &vector, &payload)).await?;

		tracing::debug!(person_id = person.id, hash = %payload.summary_hash, "Upserted embedding.");

		Ok(EmbeddingRecord { id: person.id, vector, summary, payload })
	}

	/// Idempotent.
	pub async fn remove_embedding(&self, person_id: i64) -> Result<()> {
		self.index_call(self.index.delete(person_id)).await?;

		tracing::debug!(person_id, "Removed embedding.");

		Ok(())
	}

	/// Brings the index entry for `person_id` in line with the registry. Returns the operation
	/// actually applied: an upsert for a record that no longer exists becomes a delete.
	pub async fn apply_sync(&self, person_id: i64, op: SyncOp) -> Result<SyncOp> {
		if op == SyncOp::Upsert {
			let found = self.registry_call(self.registry.fetch_by_ids(&[person_id])).await?;

			if let Some(person) = found.into_iter().find(|person| person.id == person_id) {
				self.upsert_embedding(&person).await?;

				return Ok(SyncOp::Upsert);
			}

			tracing::info!(person_id, "Person missing from registry. Removing embedding.");
		}

		self.remove_embedding(person_id).await?;

		Ok(SyncOp::Delete)
	}

	pub async fn notify(&self, req: NotifyRequest) -> Result<NotifyResponse> {
		let requested = match req.event {
			ChangeEvent::Created | ChangeEvent::Updated => SyncOp::Upsert,
			ChangeEvent::Deleted => SyncOp::Delete,
		};
		let mode = self.cfg.sync.mode.as_str();
		let op = match mode {
			SYNC_MODE_OUTBOX => {
				self.registry_call(self.sync_queue.enqueue(req.person_id, requested)).await?;

				requested
			},
			SYNC_MODE_INLINE => self.apply_sync(req.person_id, requested).await?,
			other =>
				return Err(Error::Internal { message: format!("Unsupported sync mode {other:?}.") }),
		};

		Ok(NotifyResponse { person_id: req.person_id, op, mode: mode.to_string() })
	}

	/// Re-embeds every registry record with at most `sync.resync_concurrency` embedding calls in
	/// flight. Individual failures are counted, not fatal.
	pub async fn resync_all(self: &Arc<Self>) -> Result<ResyncReport> {
		let persons = self.registry_call(self.registry.list(&PersonFilter::default())).await?;
		let today = OffsetDateTime::now_utc().date();
		let limit = self.cfg.sync.resync_concurrency.max(1) as usize;
		let semaphore = Arc::new(Semaphore::new(limit));
		let mut tasks = JoinSet::new();
		let mut report = ResyncReport { total: persons.len() as u64, ..ResyncReport::default() };

		for person in persons {
			let permit = Arc::clone(&semaphore).acquire_owned().await.map_err(|err| {
				Error::Internal { message: format!("Resync semaphore closed: {err}.") }
			})?;
			let service = Arc::clone(self);

			tasks.spawn(async move {
				let _permit = permit;
				let result = service.upsert_embedding_on(&person, today).await;

				(person.id, result)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((_, Ok(_))) => report.succeeded += 1,
				Ok((person_id, Err(err))) => {
					report.failed += 1;

					tracing::warn!(person_id, error = %err, "Resync failed for person.");
				},
				Err(err) => {
					report.failed += 1;

					tracing::error!(error = %err, "Resync task failed.");
				},
			}
		}

		tracing::info!(
			total = report.total,
			succeeded = report.succeeded,
			failed = report.failed,
			"Resync finished."
		);

		Ok(report)
	}
}
