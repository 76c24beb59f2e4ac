use std::{
	sync::{Arc, atomic::Ordering},
	time::Duration,
};

use time::{OffsetDateTime, macros::date};

use nlq_domain::{DocumentType, Gender, person_summary};
use nlq_service::{
	ChangeEvent, ErrorKind, IndexPayload, NlqService, NotifyRequest, Providers, QueryData, SyncOp,
};
use nlq_testkit::doubles::{
	DIM, GaugedEmbedding, HashEmbedding, Harness, MemoryIndex, MemoryRegistry, RecordingLog,
	ScriptedClassifier, person, test_config,
};

fn laura() -> nlq_domain::PersonRecord {
	person(1, "Laura", "Gómez", date!(1990 - 04 - 12), Gender::Female, DocumentType::CitizenId)
}

fn andres() -> nlq_domain::PersonRecord {
	person(2, "Andrés", "Pérez", date!(2012 - 08 - 01), Gender::Male, DocumentType::IdentityCard)
}

fn carmen() -> nlq_domain::PersonRecord {
	person(3, "Carmen", "Ruiz", date!(1958 - 01 - 20), Gender::Female, DocumentType::CitizenId)
}

async fn top_ids(harness: &Harness, text: &str) -> Vec<i64> {
	let today = OffsetDateTime::now_utc().date();
	let answer =
		harness.service.semantic_search(text, Some(3), today).await.expect("Search failed.");
	let Some(QueryData::Matches(matches)) = answer.data else {
		panic!("Expected search matches.");
	};

	matches.iter().map(|m| m.person.person.id).collect()
}

#[tokio::test]
async fn upserted_record_is_its_own_nearest_neighbour() {
	let harness = Harness::new(vec![laura(), andres(), carmen()], Vec::new());

	for person in [laura(), andres(), carmen()] {
		harness.service.upsert_embedding(&person).await.expect("Upsert failed.");
	}

	for person in [laura(), andres(), carmen()] {
		let summary = person_summary(&person, OffsetDateTime::now_utc().date());

		assert_eq!(top_ids(&harness, &summary).await.first(), Some(&person.id));
	}
}

#[tokio::test]
async fn upsert_overwrites_and_reports_payload() {
	let harness = Harness::new(vec![laura()], Vec::new());
	let first = harness.service.upsert_embedding(&laura()).await.expect("Upsert failed.");
	let mut renamed = laura();

	renamed.surnames = "Gómez Duarte".to_string();

	let second = harness.service.upsert_embedding(&renamed).await.expect("Upsert failed.");

	assert_eq!(harness.index.ids(), vec![1]);
	assert_ne!(first.payload.summary_hash, second.payload.summary_hash);
	assert_eq!(second.vector, HashEmbedding::vector_for(&second.summary));

	let stored = harness.index.payload(1).expect("Missing payload.");

	assert_eq!(stored.full_name, "Laura Gómez Duarte");
	assert_eq!(stored.gender, Gender::Female);
}

#[tokio::test]
async fn failed_embedding_writes_nothing() {
	let harness = Harness::new(vec![laura()], Vec::new());

	harness.embedding.failures_left.store(1, Ordering::SeqCst);

	let err = harness.service.upsert_embedding(&laura()).await.expect_err("Expected failure.");

	assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
	assert!(harness.index.ids().is_empty());
	// Exactly one embedding call; the synchronizer does not retry.
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn removed_record_never_comes_back_from_search() {
	let harness = Harness::new(vec![laura(), andres()], Vec::new());

	for person in [laura(), andres()] {
		harness.service.upsert_embedding(&person).await.expect("Upsert failed.");
	}

	harness.service.remove_embedding(1).await.expect("Remove failed.");
	// Removing again is fine.
	harness.service.remove_embedding(1).await.expect("Second remove failed.");

	let summary = person_summary(&laura(), OffsetDateTime::now_utc().date());

	assert!(!top_ids(&harness, &summary).await.contains(&1));
}

#[tokio::test]
async fn inline_notifications_keep_the_index_fresh() {
	let harness = Harness::new(vec![laura()], Vec::new());
	let created = harness
		.service
		.notify(NotifyRequest { event: ChangeEvent::Created, person_id: 1 })
		.await
		.expect("Notify failed.");

	assert_eq!(created.op, SyncOp::Upsert);
	assert_eq!(created.mode, "inline");
	assert_eq!(harness.index.ids(), vec![1]);

	let deleted = harness
		.service
		.notify(NotifyRequest { event: ChangeEvent::Deleted, person_id: 1 })
		.await
		.expect("Notify failed.");

	assert_eq!(deleted.op, SyncOp::Delete);
	assert!(harness.index.ids().is_empty());
}

#[tokio::test]
async fn update_for_a_vanished_record_removes_its_entry() {
	let harness = Harness::new(vec![laura()], Vec::new());

	harness.service.upsert_embedding(&laura()).await.expect("Upsert failed.");
	harness.registry.remove(1);

	let response = harness
		.service
		.notify(NotifyRequest { event: ChangeEvent::Updated, person_id: 1 })
		.await
		.expect("Notify failed.");

	assert_eq!(response.op, SyncOp::Delete);
	assert!(harness.index.ids().is_empty());
}

#[tokio::test]
async fn outbox_mode_defers_index_writes() {
	let harness = Harness::with_config(test_config("outbox"), vec![laura()], Vec::new());
	let response = harness
		.service
		.notify(NotifyRequest { event: ChangeEvent::Created, person_id: 1 })
		.await
		.expect("Notify failed.");

	assert_eq!(response.mode, "outbox");
	assert_eq!(harness.registry.queued(), vec![(1, SyncOp::Upsert)]);
	assert!(harness.index.ids().is_empty());
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);

	// What the worker does with the queued job.
	let applied = harness.service.apply_sync(1, SyncOp::Upsert).await.expect("Apply failed.");

	assert_eq!(applied, SyncOp::Upsert);
	assert_eq!(harness.index.ids(), vec![1]);
}

#[tokio::test]
async fn resync_counts_failures_without_aborting() {
	let harness = Harness::new(vec![laura(), andres(), carmen()], Vec::new());

	*harness.embedding.fail_on.lock().unwrap() = Some("Andrés".to_string());

	// A stale entry for a record the registry no longer has is left alone by resync.
	harness.index.plant(
		99,
		vec![1.0; DIM],
		IndexPayload::for_person(&laura(), "stale", OffsetDateTime::now_utc().date()),
	);

	let report = harness.service.resync_all().await.expect("Resync failed.");

	assert_eq!(report.total, 3);
	assert_eq!(report.succeeded, 2);
	assert_eq!(report.failed, 1);
	assert_eq!(harness.index.ids(), vec![1, 3, 99]);

	let stored = harness.index.payload(3).expect("Missing payload.");
	let today = OffsetDateTime::now_utc().date();

	assert_eq!(stored.age, carmen().age_on(today));
}

fn gauged_resync_service(concurrency: u32) -> (Arc<NlqService>, Arc<GaugedEmbedding>) {
	let mut cfg = test_config("inline");

	cfg.sync.resync_concurrency = concurrency;

	let persons: Vec<_> = (1..=8)
		.map(|id| {
			let birth = date!(2000 - 01 - 01);

			person(id, "Persona", "Prueba", birth, Gender::Male, DocumentType::CitizenId)
		})
		.collect();
	let registry = Arc::new(MemoryRegistry::with(persons));
	let embedding = Arc::new(GaugedEmbedding::new(Duration::from_millis(20)));
	let service = NlqService::new(
		cfg,
		registry.clone(),
		Arc::new(MemoryIndex::default()),
		registry,
		Providers::new(embedding.clone(), Arc::new(ScriptedClassifier::default())),
		Arc::new(RecordingLog::default()),
	);

	(Arc::new(service), embedding)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resync_keeps_embedding_calls_within_concurrency() {
	let (service, embedding) = gauged_resync_service(3);
	let report = service.resync_all().await.expect("Resync failed.");
	let peak = embedding.peak.load(Ordering::SeqCst);

	assert_eq!(report.succeeded, 8);
	assert!(peak <= 3, "peak in-flight embedding calls was {peak}");
	assert!(peak > 1, "embedding calls never overlapped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resync_with_concurrency_one_is_sequential() {
	let (service, embedding) = gauged_resync_service(1);
	let report = service.resync_all().await.expect("Resync failed.");

	assert_eq!(report.succeeded, 8);
	assert_eq!(embedding.peak.load(Ordering::SeqCst), 1);
}
