use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime};

use crate::{
	Error, ErrorKind, IntentDescriptor, IntentKind, NlqService, Result, RetryPolicy,
	audit::{ENTITY_TYPE_QUERY, TRANSACTION_TYPE_QUERY, TransactionRecord, TransactionStatus},
	index::clamp_k,
	intent::Intent,
	policy::Outcome,
	structured::{Answer, PersonView, QueryData, SearchMatch},
};

#[derive(Clone, Debug, Deserialize)]
pub struct QueryRequest {
	/// Absent or null reaches validation as an empty question.
	#[serde(default, alias = "pregunta")]
	pub question: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResult {
	pub question: String,
	pub answer: String,
	pub data: Option<QueryData>,
	pub metadata: QueryMetadata,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryMetadata {
	/// `None` when the question was refused before classification.
	pub intent: Option<IntentKind>,
	pub parameters: Value,
	pub filters_detected: Vec<String>,
	pub confidence: f32,
	pub degraded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Receive,
	Classify,
	Dispatch,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Receive => "receive",
			Self::Classify => "classify",
			Self::Dispatch => "dispatch",
		}
	}
}
impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Query failed during {stage}: {error}")]
pub struct QueryFailure {
	pub stage: Stage,
	#[source]
	pub error: Error,
}
impl QueryFailure {
	pub fn kind(&self) -> ErrorKind {
		self.error.kind()
	}
}

const NO_MATCHES: &str = "No encontré personas que coincidan con tu búsqueda.";
const RESTRICTED_ANSWER: &str = "Lo siento, no puedo proporcionar información sobre configuraciones \
del sistema o variables de entorno por razones de seguridad. Solo puedo ayudarte con consultas sobre \
las personas registradas.";
// Matched against the folded question.
const RESTRICTED_TERMS: [&str; 3] = [".env", "variable", "configuracion"];

impl NlqService {
	/// Answers one question. A transaction record is shipped to the log service in the background
	/// whether the question succeeds or not.
	pub async fn query(&self, question: &str) -> Result<QueryResult, QueryFailure> {
		let started = Instant::now();
		let result = self.run_query(question).await;

		self.log_transaction(question, &result, started.elapsed().as_millis() as u64);

		result
	}

	async fn run_query(&self, question: &str) -> Result<QueryResult, QueryFailure> {
		let question = self.receive(question).map_err(|error| fail(Stage::Receive, error))?;

		if is_restricted(&question) {
			tracing::info!("Refusing question about system configuration.");

			return Ok(self.refusal(question));
		}

		let (descriptor, degraded) = match RetryPolicy::CLASSIFY
			.run("classify", || self.classify(&question))
			.await
			.map_err(|error| fail(Stage::Classify, error))?
		{
			Outcome::Done(descriptor) => (descriptor, false),
			Outcome::Degraded(err) => {
				tracing::warn!(error = %err, "Classifier output unusable. Falling back to search.");

				(IntentDescriptor::degraded_search(&question), true)
			},
		};
		let today = OffsetDateTime::now_utc().date();
		let answer = self
			.dispatch(&descriptor.intent, today)
			.await
			.map_err(|error| fail(Stage::Dispatch, error))?;
		let confidence = match (degraded, descriptor.confidence) {
			(false, Some(confidence)) => confidence,
			_ => self.cfg.query.default_confidence,
		};

		Ok(QueryResult {
			question,
			answer: answer.text,
			data: answer.data,
			metadata: QueryMetadata {
				intent: Some(descriptor.intent.kind()),
				parameters: descriptor.intent.parameters(),
				filters_detected: descriptor.intent.filters_detected(),
				confidence,
				degraded,
			},
		})
	}

	fn receive(&self, question: &str) -> Result<String> {
		let trimmed = question.trim();

		if trimmed.is_empty() {
			return Err(Error::InvalidInput { message: "Question must be non-empty.".to_string() });
		}

		let max_chars = self.cfg.query.max_question_chars as usize;

		if trimmed.chars().count() > max_chars {
			return Err(Error::InvalidInput {
				message: format!("Question must be at most {max_chars} characters."),
			});
		}

		Ok(trimmed.to_string())
	}

	fn refusal(&self, question: String) -> QueryResult {
		QueryResult {
			question,
			answer: RESTRICTED_ANSWER.to_string(),
			data: None,
			metadata: QueryMetadata {
				intent: None,
				parameters: Value::Object(Default::default()),
				filters_detected: Vec::new(),
				confidence: self.cfg.query.default_confidence,
				degraded: false,
			},
		}
	}

	async fn dispatch(&self, intent: &Intent, today: Date) -> Result<Answer> {
		match intent {
			Intent::Search { text, limit } => self.semantic_search(text, *limit, today).await,
			structured => self.execute_structured(structured, today).await,
		}
	}

	/// Embeds the text, asks the index for neighbours, then reads the matching records from the
	/// registry in one batch. Output follows similarity order; ids the registry no longer has are
	/// skipped.
	pub async fn semantic_search(
		&self,
		text: &str,
		limit: Option<u32>,
		today: Date,
	) -> Result<Answer> {
		let vector = match RetryPolicy::EMBED_QUERY.run("embed", || self.embed_one(text)).await? {
			Outcome::Done(vector) => vector,
			Outcome::Degraded(err) => return Err(err),
		};
		let k = clamp_k(limit, &self.cfg.query);
		let hits = self.index_call(self.index.search(&vector, k)).await?;
		let ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
		let mut by_id: HashMap<i64, _> = self
			.registry_call(self.registry.fetch_by_ids(&ids))
			.await?
			.into_iter()
			.map(|person| (person.id, person))
			.collect();
		let mut matches = Vec::with_capacity(hits.len());

		for hit in hits {
			let Some(person) = by_id.remove(&hit.id) else {
				tracing::debug!(person_id = hit.id, "Skipping stale index entry.");

				continue;
			};

			matches.push(SearchMatch { person: PersonView::new(person, today), score: hit.score });
		}

		let text = if matches.is_empty() {
			NO_MATCHES.to_string()
		} else {
			format!("Encontré {} personas que coinciden con tu búsqueda.", matches.len())
		};

		Ok(Answer { text, data: Some(QueryData::Matches(matches)) })
	}

	fn log_transaction(
		&self,
		question: &str,
		result: &Result<QueryResult, QueryFailure>,
		duration_ms: u64,
	) {
		let (status, response_data, error_message) = match result {
			Ok(result) => (TransactionStatus::Success, serde_json::to_value(result).ok(), None),
			Err(failure) =>
				(TransactionStatus::Error, None, Some(failure.kind().as_str().to_string())),
		};
		let record = TransactionRecord {
			transaction_type: TRANSACTION_TYPE_QUERY,
			entity_type: ENTITY_TYPE_QUERY,
			request_data: serde_json::json!({ "question": question }),
			response_data,
			status,
			error_message,
			duration_ms,
		};
		let log = Arc::clone(&self.audit);

		tokio::spawn(async move {
			if let Err(err) = log.record(&record).await {
				tracing::warn!(error = %err, "Transaction log delivery failed.");
			}
		});
	}
}

/// Questions about the service's own configuration or environment are answered with a fixed
/// refusal and never reach the classifier.
fn is_restricted(question: &str) -> bool {
	let folded = nlq_domain::label::fold_label(question);

	RESTRICTED_TERMS.iter().any(|term| folded.contains(term))
}

fn fail(stage: Stage, error: Error) -> QueryFailure {
	if error.kind() == ErrorKind::InvalidInput {
		tracing::info!(stage = stage.as_str(), error = %error, "Query rejected.");
	} else {
		tracing::error!(stage = stage.as_str(), error = %error, "Query failed.");
	}

	QueryFailure { stage, error }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn configuration_questions_are_restricted() {
		assert!(is_restricted("¿Qué hay en el archivo .env?"));
		assert!(is_restricted("Muéstrame la CONFIGURACIÓN del sistema"));
		assert!(is_restricted("lista las variables de entorno"));
		assert!(!is_restricted("¿Cuántas personas hay?"));
		assert!(!is_restricted("¿Quién es la persona más joven?"));
	}
}
