mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Audit, Config, EmbeddingProviderConfig, EmbeddingSync, LlmProviderConfig, Postgres, Providers,
	Qdrant, Query, Security, Service, Storage,
};

use std::{fs, path::Path};

pub const SYNC_MODE_INLINE: &str = "inline";
pub const SYNC_MODE_OUTBOX: &str = "outbox";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("llm_classifier", &cfg.providers.llm_classifier.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm_classifier.timeout_ms", cfg.providers.llm_classifier.timeout_ms),
		("query.timeout_ms", cfg.query.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	let temperature = cfg.providers.llm_classifier.temperature;

	if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.llm_classifier.temperature must be in the range 0.0-2.0."
				.to_string(),
		});
	}
	if cfg.query.default_k == 0 {
		return Err(Error::Validation {
			message: "query.default_k must be greater than zero.".to_string(),
		});
	}
	if cfg.query.max_k < cfg.query.default_k {
		return Err(Error::Validation {
			message: "query.max_k must be greater than or equal to query.default_k.".to_string(),
		});
	}
	if !cfg.query.default_confidence.is_finite()
		|| !(0.0..=1.0).contains(&cfg.query.default_confidence)
	{
		return Err(Error::Validation {
			message: "query.default_confidence must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.query.max_question_chars == 0 {
		return Err(Error::Validation {
			message: "query.max_question_chars must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.sync.mode.as_str(), SYNC_MODE_INLINE | SYNC_MODE_OUTBOX) {
		return Err(Error::Validation {
			message: "sync.mode must be one of inline or outbox.".to_string(),
		});
	}
	if cfg.sync.resync_concurrency == 0 {
		return Err(Error::Validation {
			message: "sync.resync_concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.outbox_poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "sync.outbox_poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if let Some(audit) = cfg.audit.as_ref() {
		let url = audit.log_service_url.as_str();

		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(Error::Validation {
				message: "audit.log_service_url must be an http(s) URL.".to_string(),
			});
		}
		if audit.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "audit.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.sync.mode = cfg.sync.mode.trim().to_ascii_lowercase();

	if cfg.audit.as_ref().map(|audit| audit.log_service_url.trim().is_empty()).unwrap_or(false) {
		cfg.audit = None;
	}
	if let Some(audit) = cfg.audit.as_mut() {
		audit.log_service_url = audit.log_service_url.trim().trim_end_matches('/').to_string();
	}
}
