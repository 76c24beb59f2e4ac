use std::sync::Arc;

use nlq_service::{
	HttpTransactionLog, NlqService, NoopTransactionLog, PgRegistry, Providers, QdrantIndex,
	TransactionLog, VectorIndex,
};
use nlq_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<NlqService>,
}
impl AppState {
	/// Connects to Postgres and Qdrant, bootstraps both, and wires the production collaborators.
	pub async fn new(config: nlq_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let index = QdrantIndex::new(QdrantStore::new(&config.storage.qdrant)?);

		index.ensure_collection().await?;

		let registry = Arc::new(PgRegistry::new(db));
		let audit: Arc<dyn TransactionLog> = match &config.audit {
			Some(audit) => Arc::new(HttpTransactionLog::new(audit)?),
			None => {
				tracing::info!("No log service configured. Transaction records are dropped.");

				Arc::new(NoopTransactionLog)
			},
		};
		let service = NlqService::new(
			config,
			registry.clone(),
			Arc::new(index),
			registry,
			Providers::default(),
			audit,
		);

		Ok(Self::from_service(Arc::new(service)))
	}

	pub fn from_service(service: Arc<NlqService>) -> Self {
		Self { service }
	}
}
