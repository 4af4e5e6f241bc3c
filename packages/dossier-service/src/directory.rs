//! Directory index.
//!
//! One card per identity key in the shared `entity_directory` partition.
//! Cards are what entity search and typeahead scan; they are rewritten in
//! place on every ingest that carries identity signals.

use serde_json::{Map, Value};

use dossier_domain::{DIRECTORY_PARTITION, IdentityProfile};
use dossier_store::{DocumentBatch, FetchRequest};

use crate::{DossierService, Result};

/// Directory contents for the admin inspection endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DirectoryDump {
	pub count: usize,
	pub ids: Vec<String>,
	pub documents: Vec<String>,
	pub metadatas: Vec<Map<String, Value>>,
}

impl DossierService {
	/// Writes or refreshes the card for one identity.
	///
	/// A profile without identity signals writes nothing at all, not even an
	/// embedding call; returns whether a card was written.
	pub async fn ensure_directory_entry(
		&self,
		entity: &str,
		profile: &IdentityProfile,
	) -> Result<bool> {
		if !profile.has_identity_signals() {
			return Ok(false);
		}

		let text = card_text(profile);
		let embedding = self.embed_one(&text).await?;
		let partition = self.store.ensure_partition(DIRECTORY_PARTITION).await?;
		let batch = DocumentBatch {
			ids: vec![entity.to_owned()],
			documents: vec![text],
			metadatas: vec![card_metadata(entity, profile)],
			embeddings: vec![embedding],
		};

		self.store.upsert(&partition, batch).await?;

		Ok(true)
	}

	pub async fn dump_directory(&self, limit: u32, offset: u32) -> Result<DirectoryDump> {
		let partition = self.store.ensure_partition(DIRECTORY_PARTITION).await?;
		let outcome = self
			.store
			.fetch(
				&partition,
				FetchRequest { limit: Some(limit), offset: Some(offset), ..Default::default() },
			)
			.await?;

		Ok(DirectoryDump {
			count: outcome.ids.len(),
			ids: outcome.ids,
			documents: outcome.documents,
			metadatas: outcome.metadatas,
		})
	}
}

fn card_text(profile: &IdentityProfile) -> String {
	let mut lines = Vec::new();
	let mut push = |label: &str, value: Option<&String>| {
		if let Some(value) = value {
			lines.push(format!("{label}: {value}"));
		}
	};

	push("name", profile.name.as_ref());
	push("company", profile.company.as_ref());
	push("email", profile.email.as_ref());
	push("phone", profile.phone.as_ref());
	push("address", profile.address_line.as_ref());

	if !profile.aliases.is_empty() {
		lines.push(format!("aliases: {}", profile.aliases.join(", ")));
	}

	lines.join("\n")
}

fn card_metadata(entity: &str, profile: &IdentityProfile) -> Map<String, Value> {
	let mut metadata = Map::new();
	let mut push = |key: &str, value: Option<&String>| {
		if let Some(value) = value {
			metadata.insert(key.to_owned(), Value::String(value.clone()));
		}
	};

	push("name", profile.name.as_ref());
	push("company", profile.company.as_ref());
	push("email", profile.email.as_ref());
	push("phone", profile.phone.as_ref());
	push("phone_digits", profile.phone_digits.as_ref());
	push("address_line", profile.address_line.as_ref());

	metadata.insert("entity".to_owned(), Value::String(entity.to_owned()));

	if !profile.aliases.is_empty() {
		metadata.insert("aliases".to_owned(), Value::String(profile.aliases.join(", ")));
	}

	metadata
}
