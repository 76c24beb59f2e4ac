pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nlq_service::{NlqService, NoopTransactionLog, PgRegistry, Providers, QdrantIndex, VectorIndex};
use nlq_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = nlq_cli::VERSION,
	rename_all = "kebab",
	styles = nlq_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nlq_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if config.sync.mode != nlq_config::SYNC_MODE_OUTBOX {
		tracing::warn!(mode = %config.sync.mode, "Sync mode is not outbox. The queue may stay empty.");
	}

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let index = QdrantIndex::new(QdrantStore::new(&config.storage.qdrant)?);

	index.ensure_collection().await?;

	let registry = Arc::new(PgRegistry::new(db.clone()));
	let poll_interval_ms = config.sync.outbox_poll_interval_ms;
	let service = NlqService::new(
		config,
		registry.clone(),
		Arc::new(index),
		registry,
		Providers::default(),
		Arc::new(NoopTransactionLog),
	);
	let state = worker::WorkerState::new(db, Arc::new(service), poll_interval_ms);

	worker::run_worker(state).await
}
