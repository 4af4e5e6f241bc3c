use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use dossier_service::{MatchProvenance, Providers, SearchRequest};

use super::{CannedCompletion, HashEmbedding, SpyEmbedding, VECTOR_DIM};

fn providers() -> Providers {
	Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	)
}

fn search(term: &str) -> SearchRequest {
	SearchRequest { term: term.to_string(), limit: None, include_counts: false }
}

#[tokio::test]
async fn digit_terms_rank_phone_cards_first() {
	let (service, _store) = super::build_service(providers());

	service
		.ingest(&json!({
			"module": "Leads",
			"Lead_Name": "John Doe",
			"Email": "john.doe@acme.com",
			"Phone": "+1-555-0123",
		}))
		.await
		.expect("First ingest failed.");
	service
		.ingest(&json!({
			"module": "Leads",
			"Lead_Name": "Agent 555",
			"Email": "agent@numbers.io",
		}))
		.await
		.expect("Second ingest failed.");

	let response = service.search_entities(search("5550123")).await.expect("Search failed.");

	assert!(!response.matches.is_empty());
	assert_eq!(response.matches[0].entity, "john.doe@acme.com");
	assert_eq!(response.matches[0].provenance, MatchProvenance::Fields);
	assert!(response.matches[0].hits.contains(&"phone digits".to_string()));
}

#[tokio::test]
async fn scored_matches_lead_vector_only_ones() {
	let (service, _store) = super::build_service(providers());

	service
		.ingest(&json!({
			"module": "Leads",
			"Lead_Name": "John Doe",
			"Company": "Acme Corp",
			"Email": "john.doe@acme.com",
		}))
		.await
		.expect("First ingest failed.");
	service
		.ingest(&json!({
			"module": "Leads",
			"Lead_Name": "Bob Smith",
			"Company": "Beta LLC",
			"Email": "bob@beta.io",
		}))
		.await
		.expect("Second ingest failed.");

	let response = service.search_entities(search("acme")).await.expect("Search failed.");

	assert_eq!(response.matches.len(), 2);
	assert_eq!(response.matches[0].entity, "john.doe@acme.com");
	assert_eq!(response.matches[0].provenance, MatchProvenance::Fields);
	assert!(response.matches[0].score > 0);
	assert_eq!(response.matches[1].entity, "bob@beta.io");
	assert_eq!(response.matches[1].provenance, MatchProvenance::Vector);
	assert!(response.matches[1].distance.is_some());
	assert!(response.matches[1].modules.is_none());
}

#[tokio::test]
async fn typeahead_enriches_with_module_counts() {
	let (service, _store) = super::build_service(providers());

	for payload in [
		json!({ "module": "Leads", "id": "L-1", "Lead_Name": "John Doe", "Email": "john.doe@acme.com" }),
		json!({ "module": "Deals", "id": "D-1", "Deal_Name": "Renewal", "Stage": "Open", "Email": "john.doe@acme.com" }),
		json!({ "module": "Notes", "id": "N-1", "Note_Title": "Recap", "Note_Content": "Quick recap.", "entity": "john.doe@acme.com" }),
	] {
		service.ingest(&payload).await.expect("Ingest failed.");
	}

	let response = service.typeahead("john".to_string(), None).await.expect("Typeahead failed.");
	let modules = response.matches[0].modules.as_ref().expect("Counts missing.");

	assert_eq!(modules.get("Leads"), Some(&1));
	assert_eq!(modules.get("Deals"), Some(&1));
	assert_eq!(modules.get("Notes"), Some(&1));
}

#[tokio::test]
async fn blank_terms_return_nothing_without_calls() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, _store) = super::build_service(providers);
	let response = service.search_entities(search("   ")).await.expect("Search failed.");

	assert!(response.matches.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn limits_cap_the_match_list() {
	let (service, _store) = super::build_service(providers());

	for email in ["a@corp.com", "b@corp.com", "c@corp.com"] {
		service
			.ingest(&json!({ "module": "Leads", "Lead_Name": "Corp Lead", "Email": email }))
			.await
			.expect("Ingest failed.");
	}

	let response = service
		.search_entities(SearchRequest {
			term: "corp".to_string(),
			limit: Some(2),
			include_counts: false,
		})
		.await
		.expect("Search failed.");

	assert_eq!(response.matches.len(), 2);
}
