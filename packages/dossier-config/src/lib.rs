mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, ChromaConfig, CompletionProviderConfig, Config, EmbeddingProviderConfig, Providers,
	Retrieval, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.storage.backend.as_str(), "chroma" | "memory") {
		return Err(Error::Validation {
			message: "storage.backend must be one of chroma or memory.".to_string(),
		});
	}
	if cfg.storage.backend == "chroma" && cfg.storage.chroma.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.chroma.url must be non-empty for the chroma backend.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.completion.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.completion.max_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, value) in [
		("retrieval.top_k", cfg.retrieval.top_k),
		("retrieval.context_limit", cfg.retrieval.context_limit),
		("retrieval.lexical_scan_limit", cfg.retrieval.lexical_scan_limit),
		("retrieval.directory_recall_k", cfg.retrieval.directory_recall_k),
		("retrieval.directory_scan_limit", cfg.retrieval.directory_scan_limit),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.chunking.window_words == 0 {
		return Err(Error::Validation {
			message: "chunking.window_words must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_words >= cfg.chunking.window_words {
		return Err(Error::Validation {
			message: "chunking.overlap_words must be less than chunking.window_words.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.storage
		.chroma
		.shared_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.storage.chroma.shared_key = None;
	}
	if cfg
		.security
		.webhook_shared_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.webhook_shared_key = None;
	}
	if cfg
		.security
		.admin_shared_key
		.as_deref()
		.map(|key| key.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_shared_key = None;
	}
}
