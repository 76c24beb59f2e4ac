use std::{sync::Arc, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use nlq_service::{NlqService, SyncOp};
use nlq_storage::{db::Db, models::EmbeddingOutboxEntry, outbox};

const CLAIM_LEASE_SECONDS: i64 = 30;
const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub service: Arc<NlqService>,
	pub poll_interval: StdDuration,
}
impl WorkerState {
	pub fn new(db: Db, service: Arc<NlqService>, poll_interval_ms: u64) -> Self {
		Self { db, service, poll_interval: StdDuration::from_millis(poll_interval_ms) }
	}
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	tracing::info!(poll_interval_ms = state.poll_interval.as_millis() as u64, "Worker started.");

	loop {
		match process_once(&state).await {
			// Drain back-to-back while there is work.
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => tracing::error!(error = %err, "Embedding outbox processing failed."),
		}

		tokio_time::sleep(state.poll_interval).await;
	}
}

/// Claims and applies at most one due job. Returns whether a job was claimed.
pub async fn process_once(state: &WorkerState) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let Some(job) =
		outbox::claim_next(&state.db, now, Duration::seconds(CLAIM_LEASE_SECONDS)).await?
	else {
		return Ok(false);
	};
	let result = match SyncOp::parse(&job.op) {
		Some(op) => state.service.apply_sync(job.person_id, op).await.map_err(eyre::Report::from),
		None => Err(eyre::eyre!("Unsupported outbox op: {}.", job.op)),
	};

	match result {
		Ok(applied) => {
			outbox::mark_done(&state.db, job.outbox_id, OffsetDateTime::now_utc()).await?;

			tracing::debug!(
				outbox_id = %job.outbox_id,
				person_id = job.person_id,
				op = applied.as_str(),
				"Outbox job done."
			);
		},
		Err(err) => {
			mark_failed(&state.db, &job, &err).await?;

			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				person_id = job.person_id,
				"Outbox job failed."
			);
		},
	}

	Ok(true)
}

async fn mark_failed(db: &Db, job: &EmbeddingOutboxEntry, err: &eyre::Report) -> Result<()> {
	let next_attempts = job.attempts.saturating_add(1);
	let now = OffsetDateTime::now_utc();
	let available_at = now + backoff_for_attempt(next_attempts);
	let error_text = sanitize_outbox_error(&err.to_string());

	outbox::mark_failed(db, job.outbox_id, next_attempts, &error_text, available_at, now).await?;

	Ok(())
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

/// Strips credentials from an error before it is persisted, then bounds its length.
fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}
