//! Vector-store backends.
//!
//! Every entity lives in its own partition (a collection on the Chroma
//! backend, a keyed bucket in the in-memory fallback). The [`VectorStore`]
//! trait is the seam the service works against; both backends expose the
//! same flat result shapes so callers never see backend wire formats.

pub mod http;
pub mod memory;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

use serde_json::{Map, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resolved partition. `id` is whatever the backend addresses requests
/// with; the in-memory backend just reuses the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHandle {
	pub id: String,
	pub name: String,
}

/// Aligned columns for one upsert. Index `i` of every vector describes the
/// same document.
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
	pub ids: Vec<String>,
	pub documents: Vec<String>,
	pub metadatas: Vec<Map<String, Value>>,
	pub embeddings: Vec<Vec<f32>>,
}

impl DocumentBatch {
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	/// All four columns must line up or the upsert would silently mismatch
	/// documents and vectors.
	pub fn check_aligned(&self) -> Result<()> {
		let n = self.ids.len();

		if self.documents.len() != n || self.metadatas.len() != n || self.embeddings.len() != n {
			return Err(Error::InvalidRequest(format!(
				"batch columns are misaligned: {n} ids, {} documents, {} metadatas, {} embeddings",
				self.documents.len(),
				self.metadatas.len(),
				self.embeddings.len(),
			)));
		}

		Ok(())
	}
}

/// Nearest-neighbor results for a single query embedding, already unwrapped
/// from any per-query nesting, ascending by distance.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
	pub ids: Vec<String>,
	pub documents: Vec<String>,
	pub metadatas: Vec<Map<String, Value>>,
	pub distances: Vec<f32>,
}

/// Point lookup and scan request. `filter` is a flat equality match over
/// metadata fields.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
	pub ids: Option<Vec<String>>,
	pub filter: Option<Map<String, Value>>,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
	pub ids: Vec<String>,
	pub documents: Vec<String>,
	pub metadatas: Vec<Map<String, Value>>,
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	/// Resolves a partition by name, creating it when missing.
	fn ensure_partition<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<PartitionHandle>>;

	/// Inserts or replaces documents by id.
	fn upsert<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		batch: DocumentBatch,
	) -> BoxFuture<'a, Result<()>>;

	/// Nearest neighbors of `embedding`, optionally narrowed by a metadata
	/// equality filter.
	fn query<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		embedding: Vec<f32>,
		top_k: u32,
		filter: Option<Map<String, Value>>,
	) -> BoxFuture<'a, Result<QueryOutcome>>;

	/// Fetches documents by id or filter without a vector.
	fn fetch<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		request: FetchRequest,
	) -> BoxFuture<'a, Result<FetchOutcome>>;

	/// Cheap reachability check for health reporting.
	fn probe<'a>(&'a self) -> BoxFuture<'a, Result<()>>;

	/// Backend tag reported by the health endpoint.
	fn backend(&self) -> &'static str;
}
