use serde::Serialize;
use serde_json::Value;

use nlq_providers::log_service::LogServiceClient;

use crate::{BoxFuture, Result};

pub const TRANSACTION_TYPE_QUERY: &str = "NLP_QUERY";
pub const ENTITY_TYPE_QUERY: &str = "NLP_QUERY";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
	Success,
	Error,
}

/// One handled request, as shipped to the log service.
#[derive(Clone, Debug, Serialize)]
pub struct TransactionRecord {
	pub transaction_type: &'static str,
	pub entity_type: &'static str,
	pub request_data: Value,
	pub response_data: Option<Value>,
	pub status: TransactionStatus,
	pub error_message: Option<String>,
	pub duration_ms: u64,
}

pub trait TransactionLog
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, record: &'a TransactionRecord) -> BoxFuture<'a, Result<()>>;
}

pub struct HttpTransactionLog {
	client: LogServiceClient,
}
impl HttpTransactionLog {
	pub fn new(cfg: &nlq_config::Audit) -> Result<Self> {
		Ok(Self { client: LogServiceClient::new(cfg)? })
	}
}
impl TransactionLog for HttpTransactionLog {
	fn record<'a>(&'a self, record: &'a TransactionRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let body = serde_json::to_value(record).map_err(|err| crate::Error::Internal {
				message: format!("Failed to encode transaction record: {err}."),
			})?;

			self.client.post(&body).await?;

			Ok(())
		})
	}
}

/// Used when no log service is configured.
pub struct NoopTransactionLog;
impl TransactionLog for NoopTransactionLog {
	fn record<'a>(&'a self, _record: &'a TransactionRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}
