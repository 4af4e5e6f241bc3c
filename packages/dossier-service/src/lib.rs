//! The dossier engine.
//!
//! Ties the pure domain functions to the injected collaborators: a
//! [`VectorStore`] backend and the embedding/completion providers. Each
//! operation module covers one public capability: webhook ingest, file
//! ingest, the directory index, the ask planner, and entity search.

pub mod ask;
pub mod directory;
pub mod entity_search;
pub mod files;
pub mod ingest;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use ask::{AnswerMode, AskOutcome, AskRequest, AskSource, Turn};
pub use directory::DirectoryDump;
use dossier_config::{CompletionProviderConfig, Config, EmbeddingProviderConfig};
use dossier_providers::{completion, embedding};
use dossier_store::VectorStore;
pub use entity_search::{EntityMatch, MatchProvenance, SearchRequest, SearchResponse};
pub use files::{FileSpec, FilesIngested};
pub use ingest::IngestOutcome;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
		temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
		temperature: f32,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(completion::complete(cfg, messages, temperature))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, completion: Arc<dyn CompletionProvider>) -> Self {
		Self { embedding, completion }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

pub struct DossierService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub providers: Providers,
}

impl DossierService {
	pub fn new(cfg: Config, store: Arc<dyn VectorStore>) -> Self {
		Self { cfg, store, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn VectorStore>, providers: Providers) -> Self {
		Self { cfg, store, providers }
	}

	pub(crate) async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, texts)
			.await
			.map_err(Error::embedding)?;

		if embeddings.len() != texts.len() {
			return Err(Error::Upstream {
				provider: "embedding",
				status: None,
				detail: format!(
					"expected {} vectors, provider returned {}",
					texts.len(),
					embeddings.len()
				),
			});
		}

		Ok(embeddings)
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let texts = [text.to_owned()];
		let embeddings = self.embed_all(&texts).await?;

		embeddings.into_iter().next().ok_or_else(|| Error::Upstream {
			provider: "embedding",
			status: None,
			detail: "provider returned no vectors".to_owned(),
		})
	}
}
