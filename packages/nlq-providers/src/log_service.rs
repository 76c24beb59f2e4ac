use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::Result;

/// Client for the external transaction log service (`POST {base}/log`).
#[derive(Clone)]
pub struct LogServiceClient {
	client: Client,
	url: String,
}
impl LogServiceClient {
	pub fn new(cfg: &nlq_config::Audit) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, url: format!("{}/log", cfg.log_service_url) })
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub async fn post(&self, record: &Value) -> Result<()> {
		self.client.post(&self.url).json(record).send().await?.error_for_status()?;

		Ok(())
	}
}
