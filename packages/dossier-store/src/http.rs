//! Chroma-compatible REST backend.
//!
//! The wire format nests query results one level per query embedding; this
//! client always sends exactly one embedding and unwraps the first row, so
//! callers only ever see flat columns.

use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{Map, Value};

use crate::{
	BoxFuture, DocumentBatch, Error, FetchOutcome, FetchRequest, PartitionHandle, QueryOutcome,
	Result, VectorStore,
};

/// Shared-secret header checked by protected store deployments.
const SHARED_KEY_HEADER: &str = "x-store-key";
/// Upper bound on error detail carried out of a failed response body.
const MAX_ERROR_DETAIL: usize = 512;

pub struct HttpStore {
	client: Client,
	base: String,
	shared_key: Option<String>,
}

impl HttpStore {
	pub fn new(cfg: &dossier_config::ChromaConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			base: cfg.url.trim_end_matches('/').to_owned(),
			shared_key: cfg.shared_key.clone(),
		})
	}

	async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
		let mut request = self.client.request(method, format!("{}{path}", self.base));

		if let Some(key) = &self.shared_key {
			request = request.header(SHARED_KEY_HEADER, key);
		}
		if let Some(body) = &body {
			request = request.json(body);
		}

		let response = request.send().await?;
		let status = response.status();
		let text = response.text().await?;

		if !status.is_success() {
			return Err(Error::Api { status: status.as_u16(), detail: truncate(&text) });
		}

		// A few endpoints answer with plain text; every response a caller
		// reads fields from is JSON.
		Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
	}

	async fn resolve_partition(&self, name: &str) -> Result<PartitionHandle> {
		let listed = self.request(Method::GET, "/api/v1/collections", None).await?;

		if let Some(handle) = find_by_name(&listed, name) {
			return Ok(handle);
		}

		let created = self
			.request(Method::POST, "/api/v1/collections", Some(serde_json::json!({ "name": name })))
			.await?;

		parse_handle(&created)
	}
}

impl VectorStore for HttpStore {
	fn ensure_partition<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<PartitionHandle>> {
		Box::pin(self.resolve_partition(name))
	}

	fn upsert<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		batch: DocumentBatch,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			batch.check_aligned()?;

			if batch.is_empty() {
				return Ok(());
			}

			let body = serde_json::json!({
				"ids": batch.ids,
				"documents": batch.documents,
				"metadatas": batch.metadatas,
				"embeddings": batch.embeddings,
			});

			self.request(
				Method::POST,
				&format!("/api/v1/collections/{}/upsert", partition.id),
				Some(body),
			)
			.await?;

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
			let mut body = serde_json::json!({
				"query_embeddings": [embedding],
				"n_results": top_k,
			});

			if let Some(filter) = filter {
				body["where"] = Value::Object(filter);
			}

			let json = self
				.request(
					Method::POST,
					&format!("/api/v1/collections/{}/query", partition.id),
					Some(body),
				)
				.await?;

			Ok(parse_query(&json))
		})
	}

	fn fetch<'a>(
		&'a self,
		partition: &'a PartitionHandle,
		request: FetchRequest,
	) -> BoxFuture<'a, Result<FetchOutcome>> {
		Box::pin(async move {
			let mut body = serde_json::json!({ "include": ["documents", "metadatas"] });

			if let Some(ids) = request.ids {
				body["ids"] = serde_json::json!(ids);
			}
			if let Some(filter) = request.filter {
				body["where"] = Value::Object(filter);
			}
			if let Some(limit) = request.limit {
				body["limit"] = serde_json::json!(limit);
			}
			if let Some(offset) = request.offset {
				body["offset"] = serde_json::json!(offset);
			}

			let json = self
				.request(
					Method::POST,
					&format!("/api/v1/collections/{}/get", partition.id),
					Some(body),
				)
				.await?;

			Ok(parse_fetch(&json))
		})
	}

	fn probe<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.request(Method::GET, "/api/v1/heartbeat", None).await?;

			Ok(())
		})
	}

	fn backend(&self) -> &'static str {
		"chroma"
	}
}

fn truncate(text: &str) -> String {
	if text.len() <= MAX_ERROR_DETAIL {
		return text.to_owned();
	}

	let mut end = MAX_ERROR_DETAIL;

	while !text.is_char_boundary(end) {
		end -= 1;
	}

	text[..end].to_owned()
}

fn parse_handle(value: &Value) -> Result<PartitionHandle> {
	let id = value
		.get("id")
		.and_then(Value::as_str)
		.ok_or_else(|| Error::InvalidResponse("collection is missing an id".to_owned()))?;
	let name = value
		.get("name")
		.and_then(Value::as_str)
		.ok_or_else(|| Error::InvalidResponse("collection is missing a name".to_owned()))?;

	Ok(PartitionHandle { id: id.to_owned(), name: name.to_owned() })
}

fn find_by_name(listed: &Value, name: &str) -> Option<PartitionHandle> {
	listed.as_array()?.iter().find_map(|item| {
		let handle = parse_handle(item).ok()?;

		(handle.name == name).then_some(handle)
	})
}

/// Unwraps the first per-query row of a nested query response.
fn parse_query(json: &Value) -> QueryOutcome {
	QueryOutcome {
		ids: strings(first_row(json.get("ids"))),
		documents: strings(first_row(json.get("documents"))),
		metadatas: metadatas(first_row(json.get("metadatas"))),
		distances: numbers(first_row(json.get("distances"))),
	}
}

fn parse_fetch(json: &Value) -> FetchOutcome {
	FetchOutcome {
		ids: strings(json.get("ids")),
		documents: strings(json.get("documents")),
		metadatas: metadatas(json.get("metadatas")),
	}
}

fn first_row(value: Option<&Value>) -> Option<&Value> {
	value?.as_array()?.first()
}

fn strings(value: Option<&Value>) -> Vec<String> {
	value
		.and_then(Value::as_array)
		.map(|items| items.iter().map(|v| v.as_str().unwrap_or_default().to_owned()).collect())
		.unwrap_or_default()
}

fn metadatas(value: Option<&Value>) -> Vec<Map<String, Value>> {
	value
		.and_then(Value::as_array)
		.map(|items| items.iter().map(|v| v.as_object().cloned().unwrap_or_default()).collect())
		.unwrap_or_default()
}

fn numbers(value: Option<&Value>) -> Vec<f32> {
	value
		.and_then(Value::as_array)
		.map(|items| items.iter().map(|v| v.as_f64().unwrap_or_default() as f32).collect())
		.unwrap_or_default()
}
