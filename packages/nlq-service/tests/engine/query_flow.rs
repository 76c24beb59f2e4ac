use std::sync::{Arc, atomic::Ordering};

use serde_json::json;
use time::{OffsetDateTime, macros::date};

use nlq_domain::{DocumentType, Gender, PersonRecord, person_summary};
use nlq_service::{
	ErrorKind, IntentKind, NlqService, Providers, QueryData, Stage, audit::TransactionStatus,
};

use nlq_testkit::doubles::{
	Harness, MemoryIndex, MemoryRegistry, RecordingLog, person, test_config,
};

fn registry() -> Vec<PersonRecord> {
	vec![
		person(1, "Laura", "Gómez", date!(1990 - 04 - 12), Gender::Female, DocumentType::CitizenId),
		person(2, "Andrés", "Pérez", date!(2012 - 08 - 01), Gender::Male, DocumentType::IdentityCard),
		person(3, "Carmen", "Ruiz", date!(1958 - 01 - 20), Gender::Female, DocumentType::CitizenId),
	]
}

// Embedding the exact summary text reproduces the stored vector, so that record ranks first.
fn summary_of(id: i64) -> String {
	let person = registry().into_iter().find(|person| person.id == id).expect("Unknown person.");

	person_summary(&person, OffsetDateTime::now_utc().date())
}

#[tokio::test]
async fn count_without_filters_returns_exact_total() {
	let harness =
		Harness::new(registry(), vec![Ok(json!({ "intent": "count", "parameters": {} }))]);
	let result = harness.service.query("¿Cuántas personas hay?").await.expect("Query failed.");

	assert_eq!(result.metadata.intent, Some(IntentKind::Count));
	assert!(result.metadata.filters_detected.is_empty());
	assert!(!result.metadata.degraded);
	assert_eq!(result.metadata.confidence, 0.8);
	assert_eq!(result.data, Some(QueryData::Count { count: 3 }));
	assert_eq!(result.answer, "En el sistema hay 3 personas registradas.");
}

#[tokio::test]
async fn count_applies_detected_filters_and_reported_confidence() {
	let harness = Harness::new(
		registry(),
		vec![Ok(json!({
			"intent": "count",
			"parameters": { "genero": "Femenino", "ciudad": "Bogotá" },
			"confidence": 0.93
		}))],
	);
	let result = harness.service.query("¿Cuántas mujeres hay?").await.expect("Query failed.");

	assert_eq!(result.data, Some(QueryData::Count { count: 2 }));
	assert_eq!(result.metadata.filters_detected, vec!["gender".to_string()]);
	assert_eq!(result.metadata.parameters, json!({ "gender": "Femenino" }));
	assert_eq!(result.metadata.confidence, 0.93);
}

#[tokio::test]
async fn structured_answers_are_reproducible() {
	let answer = json!({ "intent": "stats", "parameters": {} });
	let harness = Harness::new(registry(), vec![Ok(answer.clone()), Ok(answer)]);
	let first = harness.service.query("estadísticas").await.expect("Query failed.");
	let second = harness.service.query("estadísticas").await.expect("Query failed.");

	assert_eq!(
		serde_json::to_string(&first.data).expect("serialize"),
		serde_json::to_string(&second.data).expect("serialize")
	);

	let data = serde_json::to_value(&first.data).expect("serialize");

	assert_eq!(data["total"], 3);
	assert_eq!(data["by_gender"]["Femenino"], 2);
	assert_eq!(data["by_gender"]["Prefiero no reportar"], 0);
	assert_eq!(data["by_age_group"]["minor"], 1);
	assert_eq!(data["by_age_group"]["senior"], 1);
}

#[tokio::test]
async fn youngest_on_empty_registry_is_not_an_error() {
	let harness =
		Harness::new(Vec::new(), vec![Ok(json!({ "intent": "youngest", "parameters": {} }))]);
	let result = harness.service.query("¿Quién es el más joven?").await.expect("Query failed.");

	assert_eq!(result.data, None);
	assert_eq!(result.answer, "No se encontraron personas registradas.");
}

#[tokio::test]
async fn oldest_returns_the_record_with_its_age() {
	let harness =
		Harness::new(registry(), vec![Ok(json!({ "intent": "oldest", "parameters": {} }))]);
	let result = harness.service.query("¿Quién es el mayor?").await.expect("Query failed.");
	let Some(QueryData::Person(view)) = result.data else {
		panic!("Expected a single person.");
	};

	assert_eq!(view.person.id, 3);
	assert!(result.answer.starts_with("La persona de mayor edad registrada es Carmen Ruiz"));
}

#[tokio::test]
async fn malformed_classification_degrades_to_search() {
	let harness = Harness::new(registry(), vec![Ok(json!({ "intent": "dance" }))]);

	for person in registry() {
		harness.service.upsert_embedding(&person).await.expect("Upsert failed.");
	}

	let question = summary_of(1);
	let result = harness.service.query(&question).await.expect("Query failed.");

	assert_eq!(harness.classifier.calls.load(Ordering::SeqCst), 1);
	assert!(result.metadata.degraded);
	assert_eq!(result.metadata.intent, Some(IntentKind::Search));
	assert_eq!(result.metadata.confidence, 0.8);
	assert_eq!(result.metadata.parameters, json!({ "text": question }));

	let Some(QueryData::Matches(matches)) = result.data else {
		panic!("Expected search matches.");
	};

	assert_eq!(matches.first().map(|m| m.person.person.id), Some(1));
}

#[tokio::test]
async fn unavailable_classifier_fails_after_one_retry() {
	let down = || Err(nlq_service::Error::Provider { message: "503".to_string() });
	let harness = Harness::new(registry(), vec![down(), down(), down()]);
	let failure =
		harness.service.query("¿Cuántas personas hay?").await.expect_err("Expected failure.");

	assert_eq!(failure.stage, Stage::Classify);
	assert_eq!(failure.kind(), ErrorKind::UpstreamUnavailable);
	assert_eq!(harness.classifier.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn classifier_recovers_on_retry() {
	let harness = Harness::new(
		registry(),
		vec![
			Err(nlq_service::Error::Provider { message: "timeout".to_string() }),
			Ok(json!({ "intent": "count", "parameters": {} })),
		],
	);
	let result = harness.service.query("¿Cuántas personas hay?").await.expect("Query failed.");

	assert_eq!(result.data, Some(QueryData::Count { count: 3 }));
	assert_eq!(harness.classifier.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn blank_and_oversized_questions_are_rejected_without_calls() {
	let harness = Harness::new(registry(), Vec::new());
	let blank = harness.service.query("   \n").await.expect_err("Expected failure.");
	let long = "a".repeat(501);
	let oversized = harness.service.query(&long).await.expect_err("Expected failure.");

	for failure in [blank, oversized] {
		assert_eq!(failure.stage, Stage::Receive);
		assert_eq!(failure.kind(), ErrorKind::InvalidInput);
	}

	assert_eq!(harness.classifier.calls.load(Ordering::SeqCst), 0);
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registry_failure_is_internal_and_not_retried() {
	let harness =
		Harness::new(registry(), vec![Ok(json!({ "intent": "count", "parameters": {} }))]);

	harness.registry.fail.store(true, Ordering::SeqCst);

	let failure =
		harness.service.query("¿Cuántas personas hay?").await.expect_err("Expected failure.");

	assert_eq!(failure.stage, Stage::Dispatch);
	assert_eq!(failure.kind(), ErrorKind::Internal);
	assert!(harness.service.health().await.is_err());
}

#[tokio::test]
async fn search_embedding_is_retried_once() {
	let harness = Harness::new(registry(), Vec::new());

	harness.embedding.failures_left.store(1, Ordering::SeqCst);

	let result = harness.service.query("Andrés").await.expect("Query failed.");

	assert_eq!(result.metadata.intent, Some(IntentKind::Search));
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 2);

	harness.embedding.failures_left.store(2, Ordering::SeqCst);

	let failure = harness.service.query("Andrés").await.expect_err("Expected failure.");

	assert_eq!(failure.stage, Stage::Dispatch);
	assert_eq!(failure.kind(), ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn search_limit_is_clamped_and_stale_ids_are_skipped() {
	let harness = Harness::new(
		registry(),
		vec![Ok(json!({
			"intent": "search",
			"parameters": { "text": summary_of(1), "limit": 500 }
		}))],
	);

	for person in registry() {
		harness.service.upsert_embedding(&person).await.expect("Upsert failed.");
	}

	harness.registry.remove(2);

	let result = harness.service.query("busca a Laura").await.expect("Query failed.");
	let Some(QueryData::Matches(matches)) = result.data else {
		panic!("Expected search matches.");
	};
	let ids: Vec<i64> = matches.iter().map(|m| m.person.person.id).collect();

	assert_eq!(ids.len(), 2);
	assert!(!ids.contains(&2));
	assert_eq!(ids[0], 1);
	assert!(matches.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn every_request_is_logged_in_the_background() {
	let harness =
		Harness::new(registry(), vec![Ok(json!({ "intent": "count", "parameters": {} }))]);

	harness.service.query("¿Cuántas personas hay?").await.expect("Query failed.");

	let _ = harness.service.query(" ").await;
	let records = harness.log.wait_for(2).await;

	assert_eq!(records.len(), 2);

	let success = records
		.iter()
		.find(|record| record.status == TransactionStatus::Success)
		.expect("Missing success record.");
	let failure = records
		.iter()
		.find(|record| record.status == TransactionStatus::Error)
		.expect("Missing error record.");

	assert_eq!(success.transaction_type, "NLP_QUERY");
	assert_eq!(success.request_data["question"], "¿Cuántas personas hay?");
	assert_eq!(failure.error_message.as_deref(), Some("INVALID_INPUT"));
	assert!(failure.response_data.is_none());
}

#[tokio::test]
async fn confidence_default_is_configurable() {
	let mut cfg = test_config("inline");

	cfg.query.default_confidence = 0.5;

	let harness = Harness::with_config(
		cfg,
		registry(),
		vec![Ok(json!({ "intent": "count", "parameters": {}, "confidence": 7 }))],
	);
	let result = harness.service.query("¿Cuántas personas hay?").await.expect("Query failed.");

	assert_eq!(result.metadata.confidence, 0.5);
}

#[tokio::test]
async fn configuration_questions_are_refused_without_upstream_calls() {
	let harness = Harness::new(registry(), Vec::new());
	let result = harness
		.service
		.query("¿Cuáles son las variables de entorno del archivo .env?")
		.await
		.expect("Refusal should not be an error.");

	assert_eq!(result.metadata.intent, None);
	assert!(result.data.is_none());
	assert!(result.answer.starts_with("Lo siento, no puedo proporcionar información"));
	assert!(!result.metadata.degraded);
	assert_eq!(harness.classifier.calls.load(Ordering::SeqCst), 0);
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);

	let records = harness.log.wait_for(1).await;

	assert_eq!(records.len(), 1);
	assert_eq!(records[0].status, TransactionStatus::Success);
}

#[tokio::test]
async fn default_providers_report_unreachable_classifier_as_upstream() {
	let mut cfg = test_config("inline");

	cfg.providers.llm_classifier.api_base = "http://127.0.0.1:9".to_string();

	let registry = Arc::new(MemoryRegistry::with(registry()));
	let service = NlqService::new(
		cfg,
		registry.clone(),
		Arc::new(MemoryIndex::default()),
		registry,
		Providers::default(),
		Arc::new(RecordingLog::default()),
	);
	let failure =
		service.query("¿Cuántas personas hay?").await.expect_err("Expected classifier failure.");

	assert_eq!(failure.stage, Stage::Classify);
	assert_eq!(failure.kind(), ErrorKind::UpstreamUnavailable);
}
