//! Admin file-chunk ingestion.
//!
//! Files arrive with their text already extracted; each one is windowed
//! into word chunks and upserted into the entity partition as WorkDrive
//! documents. The directory is left alone, files carry no identity fields.

use serde_json::{Map, Value, json};

use dossier_domain::{chunk::word_windows, document::build_file_document, partition_name};
use dossier_store::DocumentBatch;

use crate::{DossierService, Error, Result, ingest::now_rfc3339};

/// One extracted file, as posted to the admin ingest route.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileSpec {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub size: Option<u64>,
	#[serde(default)]
	pub content_text: String,
}

impl FileSpec {
	// The url doubles as the stable chunk-id prefix, the path stands in
	// when there is none.
	fn key(&self) -> Option<&str> {
		[self.url.as_deref(), self.path.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|key| !key.is_empty())
	}
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FilesIngested {
	pub entity: String,
	pub upserted: usize,
}

impl DossierService {
	pub async fn ingest_files(&self, entity: &str, files: &[FileSpec]) -> Result<FilesIngested> {
		let entity = entity.trim().to_owned();

		if entity.is_empty() {
			return Err(Error::validation("entity is required"));
		}
		if files.is_empty() {
			return Err(Error::validation("files must be non-empty"));
		}

		let mut batch = DocumentBatch::default();

		for file in files {
			let key = file
				.key()
				.ok_or_else(|| Error::validation("every file needs a url or path"))?;
			let payload = file_payload(file);
			let stamp = now_rfc3339();
			let chunks = word_windows(
				&file.content_text,
				self.cfg.chunking.window_words as usize,
				self.cfg.chunking.overlap_words as usize,
			);

			for (index, chunk) in chunks.iter().enumerate() {
				batch.ids.push(format!("{key}#{index}"));
				batch.documents.push(build_file_document(&payload, chunk));
				batch.metadatas.push(chunk_metadata(&entity, key, file, &stamp));
			}
		}

		if batch.ids.is_empty() {
			return Ok(FilesIngested { entity, upserted: 0 });
		}

		batch.embeddings = self.embed_all(&batch.documents).await?;

		let upserted = batch.len();
		let partition = self.store.ensure_partition(&partition_name(&entity)).await?;

		self.store.upsert(&partition, batch).await?;

		tracing::info!(entity = %entity, files = files.len(), upserted, "file chunks ingested");

		Ok(FilesIngested { entity, upserted })
	}
}

fn file_payload(file: &FileSpec) -> Value {
	let mut payload = Map::new();

	if let Some(path) = non_blank(file.path.as_deref()) {
		payload.insert("Path".to_owned(), json!(path));
	}
	if let Some(name) = non_blank(file.name.as_deref()) {
		payload.insert("Name".to_owned(), json!(name));
	}
	if let Some(size) = file.size {
		payload.insert("Size".to_owned(), json!(size));
	}
	if let Some(url) = non_blank(file.url.as_deref()) {
		payload.insert("Url".to_owned(), json!(url));
	}

	Value::Object(payload)
}

fn chunk_metadata(entity: &str, key: &str, file: &FileSpec, stamp: &str) -> Map<String, Value> {
	let mut metadata = Map::new();

	metadata.insert("entity".to_owned(), json!(entity));
	metadata.insert("module".to_owned(), json!("WorkDrive"));
	metadata.insert("record_id".to_owned(), json!(key));

	if let Some(path) = non_blank(file.path.as_deref()) {
		metadata.insert("path".to_owned(), json!(path));
	}
	if let Some(url) = non_blank(file.url.as_deref()) {
		metadata.insert("url".to_owned(), json!(url));
	}
	if let Some(name) = non_blank(file.name.as_deref()) {
		metadata.insert("name".to_owned(), json!(name));
	}
	if let Some(size) = file.size {
		metadata.insert("size".to_owned(), json!(size));
	}

	metadata.insert("ingested_at".to_owned(), json!(stamp));

	metadata
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}
