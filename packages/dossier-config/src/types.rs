use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub chunking: Chunking,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// Store strategy, chosen once at startup: "chroma" or "memory".
	pub backend: String,
	pub chroma: ChromaConfig,
}

#[derive(Debug, Deserialize)]
pub struct ChromaConfig {
	pub url: String,
	pub shared_key: Option<String>,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub completion: CompletionProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	/// Nearest-neighbor hits pulled per ask when the request has no override.
	pub top_k: u32,
	/// Blended snippets handed to generation after vector + lexical merge.
	pub context_limit: u32,
	/// Bounded per-entity dump scanned for substring hits.
	pub lexical_scan_limit: u32,
	/// Vector hits pulled from the directory per entity search.
	pub directory_recall_k: u32,
	/// Directory cards scored per entity search / typeahead.
	pub directory_scan_limit: u32,
	/// Per-entity documents sampled when counting modules for typeahead.
	pub module_count_sample: u32,
}

#[derive(Debug, Deserialize)]
pub struct Chunking {
	pub window_words: u32,
	pub overlap_words: u32,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub webhook_shared_key: Option<String>,
	pub admin_shared_key: Option<String>,
}
