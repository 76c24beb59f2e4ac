use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::EmbeddingOutboxEntry};

pub const OP_UPSERT: &str = "UPSERT";
pub const OP_DELETE: &str = "DELETE";

pub async fn enqueue(db: &Db, person_id: i64, op: &str) -> Result<Uuid> {
	let outbox_id = Uuid::new_v4();

	sqlx::query(
		"INSERT INTO embedding_outbox (outbox_id, person_id, op, status) VALUES ($1, $2, $3, 'PENDING')",
	)
	.bind(outbox_id)
	.bind(person_id)
	.bind(op)
	.execute(&db.pool)
	.await?;

	Ok(outbox_id)
}

/// Claims the oldest due job and pushes its `available_at` out by `lease` so other workers skip it
/// until the lease expires.
pub async fn claim_next(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<EmbeddingOutboxEntry>> {
	let mut tx = db.pool.begin().await?;
	let row: Option<EmbeddingOutboxEntry> = sqlx::query_as(
		"\
SELECT
	outbox_id,
	person_id,
	op,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM embedding_outbox
WHERE status IN ('PENDING','FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;

		sqlx::query(
			"UPDATE embedding_outbox SET available_at = $1, updated_at = $2 WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, outbox_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE embedding_outbox SET status = 'DONE', updated_at = $1 WHERE outbox_id = $2")
		.bind(now)
		.bind(outbox_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_failed(
	db: &Db,
	outbox_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE embedding_outbox
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE outbox_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fetch_entry(db: &Db, outbox_id: Uuid) -> Result<Option<EmbeddingOutboxEntry>> {
	let row = sqlx::query_as(
		"\
SELECT
	outbox_id,
	person_id,
	op,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM embedding_outbox
WHERE outbox_id = $1",
	)
	.bind(outbox_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
