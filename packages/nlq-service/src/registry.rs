use nlq_domain::{PersonFilter, PersonRecord};
use nlq_storage::{db::Db, outbox, queries};

use crate::{BoxFuture, Result, sync::SyncOp};

/// Read access to the personnel registry. The registry owns every write to its records.
pub trait RegistryStore
where
	Self: Send + Sync,
{
	/// Ids that no longer exist are left out of the result.
	fn fetch_by_ids<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<PersonRecord>>>;

	fn list<'a>(&'a self, filter: &'a PersonFilter) -> BoxFuture<'a, Result<Vec<PersonRecord>>>;

	fn count<'a>(&'a self, filter: &'a PersonFilter) -> BoxFuture<'a, Result<u64>>;

	fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

/// Deferred index operations, consumed by the worker.
pub trait SyncQueue
where
	Self: Send + Sync,
{
	fn enqueue(&self, person_id: i64, op: SyncOp) -> BoxFuture<'_, Result<()>>;
}

/// Postgres-backed registry reads and embedding outbox.
#[derive(Clone)]
pub struct PgRegistry {
	pub db: Db,
}
impl PgRegistry {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}
impl RegistryStore for PgRegistry {
	fn fetch_by_ids<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<PersonRecord>>> {
		Box::pin(async move { Ok(queries::fetch_persons_by_ids(&self.db, ids).await?) })
	}

	fn list<'a>(&'a self, filter: &'a PersonFilter) -> BoxFuture<'a, Result<Vec<PersonRecord>>> {
		Box::pin(async move { Ok(queries::list_persons(&self.db, filter).await?) })
	}

	fn count<'a>(&'a self, filter: &'a PersonFilter) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(queries::count_persons(&self.db, filter).await?) })
	}

	fn ping(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(self.db.ping().await?) })
	}
}
impl SyncQueue for PgRegistry {
	fn enqueue(&self, person_id: i64, op: SyncOp) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let outbox_id = outbox::enqueue(&self.db, person_id, op.as_str()).await?;

			tracing::debug!(person_id, %outbox_id, op = op.as_str(), "Queued embedding sync.");

			Ok(())
		})
	}
}
