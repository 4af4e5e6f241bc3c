use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use dossier_service::{FileSpec, Providers};
use dossier_store::{FetchRequest, VectorStore};

use super::{CannedCompletion, HashEmbedding, SpyEmbedding, VECTOR_DIM};

fn providers() -> Providers {
	Providers::new(
		Arc::new(HashEmbedding { dimensions: VECTOR_DIM }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	)
}

fn contract_file(words: usize) -> FileSpec {
	let text = (0..words).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");

	FileSpec {
		name: Some("contract.txt".to_string()),
		path: Some("/legal/contract.txt".to_string()),
		url: Some("https://drive.example.com/contract".to_string()),
		size: Some(2048),
		content_text: text,
	}
}

#[tokio::test]
async fn chunks_get_stable_ids_and_workdrive_metadata() {
	let (service, store) = super::build_service(providers());
	// window 10, overlap 4: 25 words window into chunks at 0, 6, 12, 18.
	let outcome = service
		.ingest_files("john.doe@acme.com", &[contract_file(25)])
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.upserted, 4);
	assert_eq!(store.partition_len("entity_john-doe-acme-com"), 4);

	let partition = store
		.ensure_partition("entity_john-doe-acme-com")
		.await
		.expect("Partition lookup failed.");
	let dump = store
		.fetch(&partition, FetchRequest::default())
		.await
		.expect("Fetch failed.");

	assert!(dump.ids.contains(&"https://drive.example.com/contract#0".to_string()));
	assert!(dump.ids.contains(&"https://drive.example.com/contract#3".to_string()));
	assert_eq!(dump.metadatas[0].get("module"), Some(&json!("WorkDrive")));
	assert_eq!(dump.metadatas[0].get("entity"), Some(&json!("john.doe@acme.com")));
	assert_eq!(dump.metadatas[0].get("name"), Some(&json!("contract.txt")));
	assert!(dump.documents[0].starts_with("Module: WorkDrive"), "{}", dump.documents[0]);
	assert!(dump.documents[0].contains("Content:\nw0"), "{}", dump.documents[0]);
}

#[tokio::test]
async fn all_chunks_share_one_embedding_call() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, _store) = super::build_service(providers);
	let second = FileSpec {
		name: Some("summary.txt".to_string()),
		path: None,
		url: Some("https://drive.example.com/summary".to_string()),
		size: None,
		content_text: "short summary text".to_string(),
	};
	let outcome = service
		.ingest_files("john.doe@acme.com", &[contract_file(25), second])
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.upserted, 5);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_files_upsert_nothing_and_never_embed() {
	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { dimensions: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(CannedCompletion { answer: "unused", calls: Arc::new(AtomicUsize::new(0)) }),
	);
	let (service, store) = super::build_service(providers);
	let empty = FileSpec {
		name: Some("empty.txt".to_string()),
		path: Some("/empty.txt".to_string()),
		url: None,
		size: Some(0),
		content_text: "   ".to_string(),
	};
	let outcome =
		service.ingest_files("john.doe@acme.com", &[empty]).await.expect("Ingest failed.");

	assert_eq!(outcome.upserted, 0);
	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.partition_len("entity_john-doe-acme-com"), 0);
}

#[tokio::test]
async fn files_need_a_url_or_path() {
	let (service, _store) = super::build_service(providers());
	let keyless = FileSpec {
		name: Some("orphan.txt".to_string()),
		path: None,
		url: None,
		size: None,
		content_text: "some text".to_string(),
	};
	let err = service
		.ingest_files("john.doe@acme.com", &[keyless])
		.await
		.expect_err("Ingest must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");
}

#[tokio::test]
async fn file_ingest_requires_an_entity_and_files() {
	let (service, _store) = super::build_service(providers());
	let err = service
		.ingest_files("   ", &[contract_file(5)])
		.await
		.expect_err("Blank entity must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");

	let err = service
		.ingest_files("john.doe@acme.com", &[])
		.await
		.expect_err("Empty file list must fail.");

	assert!(matches!(err, dossier_service::Error::Validation { .. }), "{err}");
}
