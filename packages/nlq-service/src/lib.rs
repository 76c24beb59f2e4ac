pub mod audit;
pub mod classifier;
pub mod index;
pub mod intent;
pub mod policy;
pub mod query;
pub mod registry;
pub mod structured;
pub mod sync;

mod error;

pub use audit::{HttpTransactionLog, NoopTransactionLog, TransactionLog, TransactionRecord};
pub use error::{Error, ErrorKind, Result};
pub use index::{EmbeddingRecord, IndexPayload, QdrantIndex, SearchHit, VectorIndex};
pub use intent::{Intent, IntentDescriptor, IntentKind};
pub use policy::{Decision, RetryPolicy};
pub use query::{QueryFailure, QueryMetadata, QueryRequest, QueryResult, Stage};
pub use registry::{PgRegistry, RegistryStore, SyncQueue};
pub use structured::{PersonView, QueryData, SearchMatch, Stats};
pub use sync::{ChangeEvent, NotifyRequest, NotifyResponse, ResyncReport, SyncOp};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

use nlq_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use nlq_providers::embedding;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait ClassifierProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub classifier: Arc<dyn ClassifierProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		classifier: Arc<dyn ClassifierProvider>,
	) -> Self {
		Self { embedding, classifier }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), classifier: provider }
	}
}

/// Everything a request needs. Holds only configuration and shared clients, so one instance serves
/// all requests behind an `Arc`.
pub struct NlqService {
	pub cfg: Config,
	pub registry: Arc<dyn RegistryStore>,
	pub index: Arc<dyn VectorIndex>,
	pub sync_queue: Arc<dyn SyncQueue>,
	pub providers: Providers,
	pub audit: Arc<dyn TransactionLog>,
}
impl NlqService {
	pub fn new(
		cfg: Config,
		registry: Arc<dyn RegistryStore>,
		index: Arc<dyn VectorIndex>,
		sync_queue: Arc<dyn SyncQueue>,
		providers: Providers,
		audit: Arc<dyn TransactionLog>,
	) -> Self {
		Self { cfg, registry, index, sync_queue, providers, audit }
	}

	/// Succeeds when the registry answers.
	pub async fn health(&self) -> Result<()> {
		self.registry_call(self.registry.ping()).await
	}

	fn call_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.query.timeout_ms)
	}

	// Registry failures, timeouts included, are internal errors.
	pub(crate) async fn registry_call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
		tokio::time::timeout(self.call_timeout(), fut).await.map_err(|_| Error::Storage {
			message: "Registry call timed out.".to_string(),
		})?
	}

	pub(crate) async fn index_call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
		tokio::time::timeout(self.call_timeout(), fut).await.map_err(|_| Error::Index {
			message: "Vector index call timed out.".to_string(),
		})?
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_string()];
		let mut vectors = self.providers.embedding.embed(cfg, &texts).await?;
		let Some(vector) = vectors.pop().filter(|_| vectors.is_empty()) else {
			return Err(Error::MalformedResponse {
				message: "Embedding provider must return exactly one vector.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::MalformedResponse {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl ClassifierProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(nlq_providers::classifier::complete_json(cfg, messages).await?) })
	}
}
