use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nlq_domain::{DocumentType, Gender, PersonFilter, label::fold_label};

use crate::{Error, Result};

const GENDER_KEYS: [&str; 2] = ["genero", "gender"];
const DOCUMENT_TYPE_KEYS: [&str; 2] = ["tipo_documento", "document_type"];
const SEARCH_TEXT_KEYS: [&str; 3] = ["text", "texto", "query"];
const SEARCH_LIMIT_KEYS: [&str; 2] = ["limit", "k"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
	Youngest,
	Oldest,
	Count,
	Search,
	Stats,
}
impl IntentKind {
	pub const ALL: [Self; 5] = [Self::Youngest, Self::Oldest, Self::Count, Self::Search, Self::Stats];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Youngest => "youngest",
			Self::Oldest => "oldest",
			Self::Count => "count",
			Self::Search => "search",
			Self::Stats => "stats",
		}
	}

	pub fn from_label(raw: &str) -> Option<Self> {
		let folded = fold_label(raw);

		Self::ALL.into_iter().find(|kind| kind.as_str() == folded)
	}

	pub fn is_structured(self) -> bool {
		!matches!(self, Self::Search)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
	Youngest,
	Oldest,
	Count { filter: PersonFilter },
	Stats { filter: PersonFilter },
	Search { text: String, limit: Option<u32> },
}
impl Intent {
	pub fn kind(&self) -> IntentKind {
		match self {
			Self::Youngest => IntentKind::Youngest,
			Self::Oldest => IntentKind::Oldest,
			Self::Count { .. } => IntentKind::Count,
			Self::Stats { .. } => IntentKind::Stats,
			Self::Search { .. } => IntentKind::Search,
		}
	}

	/// The validated parameters, as reported back to callers.
	pub fn parameters(&self) -> Value {
		match self {
			Self::Youngest | Self::Oldest => Value::Object(Map::new()),
			Self::Count { filter } | Self::Stats { filter } =>
				serde_json::to_value(filter).unwrap_or_else(|_| Value::Object(Map::new())),
			Self::Search { text, limit } => {
				let mut params = Map::new();

				params.insert("text".to_string(), Value::String(text.clone()));

				if let Some(limit) = limit {
					params.insert("limit".to_string(), Value::from(*limit));
				}

				Value::Object(params)
			},
		}
	}

	pub fn filters_detected(&self) -> Vec<String> {
		match self {
			Self::Count { filter } | Self::Stats { filter } =>
				filter.keys().into_iter().map(str::to_string).collect(),
			_ => Vec::new(),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntentDescriptor {
	pub intent: Intent,
	/// Only set when the classifier reported a finite value in `[0, 1]`.
	pub confidence: Option<f32>,
}
impl IntentDescriptor {
	/// The fallback used when classification output cannot be trusted.
	pub fn degraded_search(question: &str) -> Self {
		Self { intent: Intent::Search { text: question.to_string(), limit: None }, confidence: None }
	}
}

/// Validates the untyped classifier answer into a typed descriptor.
///
/// Unknown parameter keys are dropped silently; known keys with unusable values are dropped with
/// a warning.
pub fn parse_descriptor(raw: &Value, question: &str) -> Result<IntentDescriptor> {
	let Some(object) = raw.as_object() else {
		return Err(malformed("Classifier answer must be a JSON object."));
	};
	let kind = object
		.get("intent")
		.and_then(Value::as_str)
		.and_then(IntentKind::from_label)
		.ok_or_else(|| malformed("Classifier answer has no known intent."))?;
	let empty = Map::new();
	let params = match object.get("parameters") {
		Some(Value::Object(params)) => params,
		Some(Value::Null) | None => &empty,
		Some(_) => {
			tracing::warn!(intent = kind.as_str(), "Classifier parameters are not an object.");

			&empty
		},
	};
	let intent = match kind {
		IntentKind::Youngest => Intent::Youngest,
		IntentKind::Oldest => Intent::Oldest,
		IntentKind::Count => Intent::Count { filter: parse_filter(params) },
		IntentKind::Stats => Intent::Stats { filter: parse_filter(params) },
		IntentKind::Search => parse_search(params, question),
	};
	let confidence = object
		.get("confidence")
		.and_then(Value::as_f64)
		.filter(|value| value.is_finite() && (0.0..=1.0).contains(value))
		.map(|value| value as f32);

	Ok(IntentDescriptor { intent, confidence })
}

fn parse_filter(params: &Map<String, Value>) -> PersonFilter {
	let mut filter = PersonFilter::default();

	for (key, value) in params {
		let key = key.as_str();

		if GENDER_KEYS.contains(&key) {
			match value.as_str().and_then(Gender::from_label) {
				Some(gender) => filter.gender = Some(gender),
				None => tracing::warn!(key, value = %value, "Dropping unrecognized gender filter."),
			}
		} else if DOCUMENT_TYPE_KEYS.contains(&key) {
			match value.as_str().and_then(DocumentType::from_label) {
				Some(document_type) => filter.document_type = Some(document_type),
				None => tracing::warn!(
					key,
					value = %value,
					"Dropping unrecognized document type filter."
				),
			}
		} else {
			tracing::debug!(key, "Dropping non-whitelisted parameter.");
		}
	}

	filter
}

fn parse_search(params: &Map<String, Value>, question: &str) -> Intent {
	let text = SEARCH_TEXT_KEYS
		.iter()
		.filter_map(|key| params.get(*key).and_then(Value::as_str))
		.map(str::trim)
		.find(|text| !text.is_empty())
		.unwrap_or(question)
		.to_string();
	let limit = SEARCH_LIMIT_KEYS
		.iter()
		.filter_map(|key| params.get(*key).and_then(Value::as_u64))
		.find(|limit| *limit > 0)
		.map(|limit| limit.min(u32::MAX as u64) as u32);

	Intent::Search { text, limit }
}

fn malformed(message: &str) -> Error {
	Error::MalformedResponse { message: message.to_string() }
}
