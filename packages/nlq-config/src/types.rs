use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub query: Query,
	#[serde(default)]
	pub sync: EmbeddingSync,
	pub audit: Option<Audit>,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_classifier: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Query {
	/// Number of neighbours requested from the vector index when the intent carries no limit.
	pub default_k: u32,
	/// Upper bound applied to any requested limit.
	pub max_k: u32,
	/// Reported when the classifier does not supply its own confidence.
	pub default_confidence: f32,
	pub max_question_chars: u32,
	/// Budget for a single registry or vector index call.
	pub timeout_ms: u64,
}
impl Default for Query {
	fn default() -> Self {
		Self {
			default_k: 5,
			max_k: 20,
			default_confidence: 0.8,
			max_question_chars: 500,
			timeout_ms: 5_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingSync {
	/// `inline` applies index writes during the notification call, `outbox` defers them to the
	/// worker.
	pub mode: String,
	pub resync_concurrency: u32,
	pub outbox_poll_interval_ms: u64,
}
impl Default for EmbeddingSync {
	fn default() -> Self {
		Self { mode: "inline".to_string(), resync_concurrency: 4, outbox_poll_interval_ms: 500 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Audit {
	pub log_service_url: String,
	#[serde(default = "default_audit_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_audit_timeout_ms() -> u64 {
	2_000
}
