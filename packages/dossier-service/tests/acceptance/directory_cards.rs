use std::sync::{Arc, atomic::AtomicUsize};

use serde_json::json;

use dossier_service::Providers;

use super::{CannedCompletion, HashEmbedding, VECTOR_DIM};

fn providers() -> Providers {
	Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	)
}

#[tokio::test]
async fn cards_carry_searchable_identity_text() {
	let (service, _store) = super::build_service(providers());

	service
		.ingest(&json!({
			"module": "Leads",
			"id": "L-1",
			"Lead_Name": "John Doe",
			"Company": "Acme Corp",
			"Email": "John.Doe@Acme.com",
			"Phone": "+1-555-0123",
		}))
		.await
		.expect("Ingest failed.");

	let dump = service.dump_directory(100, 0).await.expect("Dump failed.");

	assert_eq!(dump.count, 1);
	assert_eq!(dump.ids[0], "john.doe@acme.com");
	assert!(dump.documents[0].contains("name: John Doe"), "{}", dump.documents[0]);
	assert!(dump.documents[0].contains("company: Acme Corp"), "{}", dump.documents[0]);
	assert_eq!(dump.metadatas[0].get("phone_digits"), Some(&json!("15550123")));
}

#[tokio::test]
async fn one_card_per_identity_across_modules() {
	let (service, store) = super::build_service(providers());

	service
		.ingest(&json!({
			"module": "Leads",
			"id": "L-1",
			"Lead_Name": "John Doe",
			"Email": "john.doe@acme.com",
		}))
		.await
		.expect("Lead ingest failed.");
	service
		.ingest(&json!({
			"module": "Contacts",
			"id": "C-9",
			"Full_Name": "John Doe",
			"Email": "john.doe@acme.com",
			"Mailing_City": "Springfield",
		}))
		.await
		.expect("Contact ingest failed.");

	assert_eq!(store.partition_len("entity_directory"), 1);
	assert_eq!(store.partition_len("entity_john-doe-acme-com"), 2);
}

#[tokio::test]
async fn dump_respects_limit_and_offset() {
	let (service, _store) = super::build_service(providers());

	for email in ["a@x.com", "b@x.com", "c@x.com"] {
		service
			.ingest(&json!({ "module": "Leads", "Lead_Name": "Lead", "Email": email }))
			.await
			.expect("Ingest failed.");
	}

	let page = service.dump_directory(2, 1).await.expect("Dump failed.");

	assert_eq!(page.count, 2);
	assert_eq!(page.ids, vec!["b@x.com", "c@x.com"]);
}
