use std::sync::{Arc, atomic::AtomicUsize};

use serde_json::json;

use dossier_domain::Module;
use dossier_service::Providers;

use super::{CannedCompletion, FailingEmbedding, HashEmbedding, SpyEmbedding, VECTOR_DIM};

fn providers() -> Providers {
	Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	)
}

#[tokio::test]
async fn lead_ingest_lands_in_the_identity_partition() {
	let (service, store) = super::build_service(providers());
	let outcome = service
		.ingest(&json!({
			"module": "Leads",
			"id": "L-1",
			"Lead_Name": "John Doe",
			"Company": "Acme Corp",
			"Email": "John.Doe@Acme.com",
		}))
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.entity, "john.doe@acme.com");
	assert_eq!(outcome.module, Module::Leads);
	assert_eq!(outcome.document_id, "Leads-L-1");
	assert_eq!(store.partition_len("entity_john-doe-acme-com"), 1);
	assert_eq!(store.partition_len("entity_directory"), 1);
}

#[tokio::test]
async fn redelivery_replaces_the_document_in_place() {
	let (service, store) = super::build_service(providers());
	let payload = json!({
		"module": "Leads",
		"id": "L-1",
		"Lead_Name": "John Doe",
		"Email": "john.doe@acme.com",
		"Lead_Status": "New",
	});

	service.ingest(&payload).await.expect("First ingest failed.");

	let mut updated = payload.clone();

	updated["Lead_Status"] = json!("Qualified");

	service.ingest(&updated).await.expect("Second ingest failed.");

	assert_eq!(store.partition_len("entity_john-doe-acme-com"), 1);
}

#[tokio::test]
async fn blank_identity_payloads_never_touch_the_directory() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, store) = super::build_service(providers);
	let outcome = service
		.ingest(&json!({
			"Note_Title": "Orphan note",
			"Note_Content": "No identity fields at all.",
		}))
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.module, Module::Notes);
	assert!(outcome.entity.starts_with("unknown-"), "{}", outcome.entity);
	// One embed for the record document, none for the skipped card.
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
	assert_eq!(store.partition_len("entity_directory"), 0);
}

#[tokio::test]
async fn explicit_entity_field_pins_the_partition() {
	let (service, store) = super::build_service(providers());
	let outcome = service
		.ingest(&json!({
			"entity": "jane@nimbus.io",
			"module": "Notes",
			"Note_Title": "Call recap",
			"Note_Content": "Spoke with Jane about onboarding.",
		}))
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.entity, "jane@nimbus.io");
	assert_eq!(store.partition_len("entity_jane-nimbus-io"), 1);
}

#[tokio::test]
async fn untagged_payloads_classify_by_shape() {
	let (service, _store) = super::build_service(providers());
	let outcome = service
		.ingest(&json!({
			"Deal_Name": "Acme Renewal",
			"Stage": "Negotiation",
			"Amount": 50000,
			"Email": "john.doe@acme.com",
		}))
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.module, Module::Deals);
	assert!(outcome.document_id.starts_with("Deals-"), "{}", outcome.document_id);
}

#[tokio::test]
async fn non_object_payloads_are_rejected_before_any_upstream_call() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, _store) = super::build_service(providers);
	let err = service.ingest(&json!("just a string")).await.expect_err("Ingest must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failures_surface_as_upstream_errors() {
	let providers = Providers::new(
		Arc::new(FailingEmbedding),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, store) = super::build_service(providers);
	let err = service
		.ingest(&json!({ "module": "Leads", "Lead_Name": "John", "Email": "j@x.com" }))
		.await
		.expect_err("Ingest must fail.");

	assert!(
		matches!(err, dossier_service::Error::Upstream { provider: "embedding", .. }),
		"{err}"
	);
	assert_eq!(store.partition_len("entity_j-x-com"), 0);
}
