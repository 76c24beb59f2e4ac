use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends one chat completion and returns the JSON object the model answered with.
///
/// There is no internal retry; callers decide whether a failure is worth repeating.
pub async fn complete_json(
	cfg: &nlq_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_json(json)
}

fn parse_completion_json(json: Value) -> Result<Value> {
	let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	else {
		return Err(Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		});
	};
	let parsed: Value = match serde_json::from_str(content.trim()) {
		Ok(value) => value,
		Err(_) => serde_json::from_str(first_object(content).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Completion content does not contain a JSON object.".to_string(),
			}
		})?)?,
	};

	if !parsed.is_object() {
		return Err(Error::InvalidResponse {
			message: "Completion content must be a JSON object.".to_string(),
		});
	}

	Ok(parsed)
}

// Models like to wrap the object in prose or ```json fences.
fn first_object(content: &str) -> Option<&str> {
	let start = content.find('{')?;
	let end = content.rfind('}')?;

	(end > start).then(|| &content[start..=end])
}
