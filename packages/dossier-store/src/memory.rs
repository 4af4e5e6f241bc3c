//! In-memory fallback backend.
//!
//! Holds every partition in a process-local map. Useful for development
//! without a running vector store and for tests; nothing persists across
//! restarts.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
};

use serde_json::{Map, Value};

use crate::{
	BoxFuture, DocumentBatch, FetchOutcome, FetchRequest, PartitionHandle, QueryOutcome, Result,
	VectorStore,
};

#[derive(Debug, Clone)]
struct StoredDocument {
	id: String,
	document: String,
	metadata: Map<String, Value>,
	embedding: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
	partitions: Mutex<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<StoredDocument>>> {
		self.partitions.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Document count of a partition, zero when it does not exist yet.
	pub fn partition_len(&self, name: &str) -> usize {
		self.lock().get(name).map(Vec::len).unwrap_or_default()
	}
}

impl VectorStore for MemoryStore {
	fn ensure_partition<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<PartitionHandle>> {
		Box::pin(async move {
			self.lock().entry(name.to_owned()).or_default();

			Ok(PartitionHandle { id: name.to_owned(), name: name.to_owned() })
		})
	}

	fn upsert<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		batch: DocumentBatch,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			batch.check_aligned()?;

			let mut partitions = self.lock();
			let documents = partitions.entry(partition.name.clone()).or_default();
			let rows = batch
				.ids
				.into_iter()
				.zip(batch.documents)
				.zip(batch.metadatas)
				.zip(batch.embeddings);

			for (((id, document), metadata), embedding) in rows {
				let incoming = StoredDocument { id, document, metadata, embedding };

				if let Some(existing) = documents.iter_mut().find(|doc| doc.id == incoming.id) {
					*existing = incoming;
				} else {
					documents.push(incoming);
				}
			}

			Ok(())
		})
	}

	fn query<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		embedding: Vec<f32>,
		top_k: u32,
		filter: Option<Map<String, Value>>,
	) -> BoxFuture<'a, Result<QueryOutcome>> {
		Box::pin(async move {
			let partitions = self.lock();
			let mut scored = partitions
				.get(&partition.name)
				.map(|documents| {
					documents
						.iter()
						.filter(|doc| matches_filter(&doc.metadata, filter.as_ref()))
						.map(|doc| (cosine_distance(&embedding, &doc.embedding), doc.clone()))
						.collect::<Vec<_>>()
				})
				.unwrap_or_default();

			scored.sort_by(|a, b| a.0.total_cmp(&b.0));
			scored.truncate(top_k as usize);

			let mut outcome = QueryOutcome::default();

			for (distance, doc) in scored {
				outcome.ids.push(doc.id);
				outcome.documents.push(doc.document);
				outcome.metadatas.push(doc.metadata);
				outcome.distances.push(distance);
			}

			Ok(outcome)
		})
	}

	fn fetch<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		request: FetchRequest,
	) -> BoxFuture<'a, Result<FetchOutcome>> {
		Box::pin(async move {
			let partitions = self.lock();
			let mut outcome = FetchOutcome::default();
			let Some(documents) = partitions.get(&partition.name) else { return Ok(outcome) };
			let offset = request.offset.unwrap_or_default() as usize;
			let limit = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
			let selected = documents
				.iter()
				.filter(|doc| {
					request.ids.as_ref().is_none_or(|ids| ids.contains(&doc.id))
						&& matches_filter(&doc.metadata, request.filter.as_ref())
				})
				.skip(offset)
				.take(limit);

			for doc in selected {
				outcome.ids.push(doc.id.clone());
				outcome.documents.push(doc.document.clone());
				outcome.metadatas.push(doc.metadata.clone());
			}

			Ok(outcome)
		})
	}

	fn probe<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(()) })
	}

	fn backend(&self) -> &'static str {
		"memory"
	}
}

fn matches_filter(metadata: &Map<String, Value>, filter: Option<&Map<String, Value>>) -> bool {
	filter.is_none_or(|filter| {
		filter.iter().all(|(key, expected)| metadata.get(key) == Some(expected))
	})
}

/// Distance form of cosine similarity, ascending means closer. Zero-norm
/// vectors compare as maximally distant instead of dividing by zero.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
	let mut dot = 0.0f32;
	let mut norm_a = 0.0f32;
	let mut norm_b = 0.0f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0. || norm_b == 0. {
		return 1.;
	}

	1. - dot / (norm_a.sqrt() * norm_b.sqrt())
}
