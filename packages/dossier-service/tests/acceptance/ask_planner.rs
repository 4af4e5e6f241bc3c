use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use dossier_service::{AnswerMode, AskRequest, Providers, Turn};

use super::{
	CannedCompletion, FailingCompletion, HashEmbedding, ScriptedCompletion, SpyEmbedding,
	VECTOR_DIM,
};

fn ask_request(entity: &str, question: &str) -> AskRequest {
	AskRequest {
		entity: entity.to_string(),
		question: question.to_string(),
		top_k: None,
		history: Vec::new(),
	}
}

fn deal_payload() -> serde_json::Value {
	json!({
		"module": "Deals",
		"id": "400",
		"Deal_Name": "Acme Renewal",
		"Stage": "Negotiation",
		"Amount": 50000,
		"Email": "john.doe@acme.com",
	})
}

#[tokio::test]
async fn structured_questions_skip_generation() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "should not run", calls: calls.clone() }),
	);
	let (service, _store) = super::build_service(providers);

	service.ingest(&deal_payload()).await.expect("Ingest failed.");

	let outcome = service
		.ask(ask_request("john.doe@acme.com", "What is the deal amount?"))
		.await
		.expect("Ask failed.");

	assert_eq!(outcome.mode, AnswerMode::Structured);
	assert!(outcome.answer.contains("50000"), "{}", outcome.answer);
	assert!(outcome.answer.contains("Deals-400"), "{}", outcome.answer);
	assert_eq!(outcome.sources.len(), 1);
	assert_eq!(outcome.sources[0].id, "Deals-400");
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn field_questions_without_values_report_the_gap() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "should not run", calls: calls.clone() }),
	);
	let (service, _store) = super::build_service(providers);

	service
		.ingest(&json!({
			"module": "Notes",
			"entity": "solo@x.com",
			"Note_Title": "Call recap",
			"Note_Content": "Talked pricing, no number agreed.",
		}))
		.await
		.expect("Ingest failed.");

	let outcome = service
		.ask(ask_request("solo@x.com", "What is the amount?"))
		.await
		.expect("Ask failed.");

	assert_eq!(outcome.mode, AnswerMode::FieldMissing);
	assert!(outcome.answer.contains("amount"), "{}", outcome.answer);
	assert!(outcome.sources.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_partitions_short_circuit_without_generation() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "should not run", calls: calls.clone() }),
	);
	let (service, _store) = super::build_service(providers);
	let outcome = service
		.ask(ask_request("ghost@x.com", "Tell me about this account"))
		.await
		.expect("Ask failed.");

	assert_eq!(outcome.mode, AnswerMode::NoContext);
	assert!(outcome.sources.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn grounded_answers_cite_ingested_sources() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion {
			answer: "John Doe is a lead at Acme Corp.",
			calls: calls.clone(),
		}),
	);
	let (service, _store) = super::build_service(providers);

	service
		.ingest(&json!({
			"module": "Leads",
			"id": "L-1",
			"Lead_Name": "John Doe",
			"Company": "Acme Corp",
			"Email": "John.Doe@Acme.com",
		}))
		.await
		.expect("Ingest failed.");

	let outcome = service
		.ask(ask_request("john.doe@acme.com", "Tell me about John Doe"))
		.await
		.expect("Ask failed.");

	assert_eq!(outcome.mode, AnswerMode::Generated);
	assert_eq!(outcome.answer, "John Doe is a lead at Acme Corp.");
	assert!(outcome.sources.iter().any(|s| s.id.starts_with("Leads-")), "{:?}", outcome.sources);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rewrites_only_happen_with_history() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(ScriptedCompletion::new(
			&["What is the deal stage for john.doe@acme.com?"],
			calls.clone(),
		)),
	);
	let (service, _store) = super::build_service(providers);

	service.ingest(&deal_payload()).await.expect("Ingest failed.");

	let outcome = service
		.ask(AskRequest {
			entity: "john.doe@acme.com".to_string(),
			question: "And the stage?".to_string(),
			top_k: None,
			history: vec![Turn {
				role: "user".to_string(),
				content: "We were discussing the Acme renewal deal.".to_string(),
			}],
		})
		.await
		.expect("Ask failed.");

	assert_eq!(
		outcome.rewritten_question.as_deref(),
		Some("What is the deal stage for john.doe@acme.com?")
	);
	assert_eq!(outcome.mode, AnswerMode::Structured);
	assert!(outcome.answer.contains("Negotiation"), "{}", outcome.answer);
	// The single completion call was the rewrite; the shortcut answered.
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rewrite_failures_fall_back_to_the_question_as_asked() {
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(FailingCompletion),
	);
	let (service, _store) = super::build_service(providers);

	service.ingest(&deal_payload()).await.expect("Ingest failed.");

	let outcome = service
		.ask(AskRequest {
			entity: "john.doe@acme.com".to_string(),
			question: "What is the amount?".to_string(),
			top_k: None,
			history: vec![Turn { role: "user".to_string(), content: "Earlier turn.".to_string() }],
		})
		.await
		.expect("Ask failed.");

	assert!(outcome.rewritten_question.is_none());
	assert_eq!(outcome.mode, AnswerMode::Structured);
	assert!(outcome.answer.contains("50000"), "{}", outcome.answer);
}

#[tokio::test]
async fn lexical_hits_widen_vector_recall() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "Both notes mention it.", calls: calls.clone() }),
	);
	let (service, _store) = super::build_service(providers);

	service
		.ingest(&json!({
			"module": "Notes",
			"entity": "ops@acme.com",
			"id": "N-1",
			"Note_Title": "Sighting",
			"Note_Content": "storm drake",
		}))
		.await
		.expect("First ingest failed.");
	service
		.ingest(&json!({
			"module": "Notes",
			"entity": "ops@acme.com",
			"id": "N-2",
			"Note_Title": "Quarterly operations review",
			"Note_Content": "Budget planning covered travel, hiring, vendor renewals, tooling, \
			office moves and training; one aside mentioned the storm drake account transfer \
			pending legal review since March.",
		}))
		.await
		.expect("Second ingest failed.");

	let outcome = service
		.ask(AskRequest {
			entity: "ops@acme.com".to_string(),
			question: "storm drake".to_string(),
			top_k: Some(1),
			history: Vec::new(),
		})
		.await
		.expect("Ask failed.");

	// Vector recall (capped at 1) finds the near note; the wider lexical
	// scan appends the buried one.
	assert_eq!(outcome.mode, AnswerMode::Generated);

	let ids = outcome.sources.iter().map(|s| s.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["Notes-N-1", "Notes-N-2"]);
	assert!(outcome.sources[0].distance.is_some());
	assert!(outcome.sources[1].distance.is_none());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_requests_are_rejected_before_any_upstream_call() {
	let embed_calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: embed_calls.clone() }),
		Arc::new(FailingCompletion),
	);
	let (service, _store) = super::build_service(providers);

	let err = service
		.ask(ask_request("  ", "Anything?"))
		.await
		.expect_err("Blank entity must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");

	let err = service
		.ask(ask_request("john.doe@acme.com", "   "))
		.await
		.expect_err("Blank question must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");
	assert_eq!(embed_calls.load(Ordering::SeqCst), 0);
}
