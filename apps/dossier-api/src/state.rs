use std::sync::Arc;

use color_eyre::eyre;

use dossier_service::DossierService;
use dossier_store::{VectorStore, http::HttpStore, memory::MemoryStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DossierService>,
}

impl AppState {
	pub fn new(config: dossier_config::Config) -> color_eyre::Result<Self> {
		let store = build_store(&config)?;

		Ok(Self { service: Arc::new(DossierService::new(config, store)) })
	}
}

/// Backend strategy is decided once here; everything downstream sees only
/// the [`VectorStore`] trait.
fn build_store(config: &dossier_config::Config) -> color_eyre::Result<Arc<dyn VectorStore>> {
	match config.storage.backend.as_str() {
		"chroma" => Ok(Arc::new(HttpStore::new(&config.storage.chroma)?)),
		"memory" => {
			tracing::warn!("memory backend selected; nothing persists across restarts");

			Ok(Arc::new(MemoryStore::new()))
		},
		other => Err(eyre::eyre!("unsupported storage backend: {other}")),
	}
}
