//! Webhook ingest.
//!
//! One CRM record in, one embedded document out: derive the identity,
//! classify the module, render the document, and upsert it into the
//! entity's partition. The directory card refresh rides along best-effort;
//! a failing directory write never fails the ingest.

use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use dossier_domain::{
	IdentityProfile, Module, derive_identity, document::build_document, partition_name, payload,
};
use dossier_store::DocumentBatch;

use crate::{DossierService, Error, Result};

/// What one webhook delivery produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestOutcome {
	pub entity: String,
	pub module: Module,
	pub document_id: String,
}

impl DossierService {
	/// Ingests one raw CRM payload.
	///
	/// An explicit `entity` field pins the record to that key; otherwise the
	/// derived identity key decides where it lands. Re-delivery of the same
	/// record replaces its document in place.
	pub async fn ingest(&self, payload: &Value) -> Result<IngestOutcome> {
		if !payload.is_object() {
			return Err(Error::validation("payload must be a JSON object"));
		}

		let profile = derive_identity(payload);
		let entity =
			payload::text_at(payload, "entity").unwrap_or_else(|| profile.key.clone());
		let module_tag = payload::text_at(payload, "module");
		let module = Module::resolve(module_tag.as_deref(), payload);
		let text = build_document(module, payload);
		let record_id = record_id(module, payload, &text);
		let document_id = format!("{}-{record_id}", module.as_str());
		let embedding = self.embed_one(&text).await?;
		let partition = self.store.ensure_partition(&partition_name(&entity)).await?;
		let batch = DocumentBatch {
			ids: vec![document_id.clone()],
			documents: vec![text],
			metadatas: vec![document_metadata(&entity, module, &record_id, payload, &profile)],
			embeddings: vec![embedding],
		};

		self.store.upsert(&partition, batch).await?;

		// The card refresh must not undo a successful ingest.
		if let Err(err) = self.ensure_directory_entry(&entity, &profile).await {
			tracing::warn!(entity = %entity, error = %err, "directory card refresh failed");
		}

		Ok(IngestOutcome { entity, module, document_id })
	}
}

/// Stable identifier of the source record, preferring explicit id fields and
/// falling back to a content hash so unnamed records still get replaceable
/// ids.
fn record_id(module: Module, payload: &Value, document: &str) -> String {
	payload::first_text(payload, &["id", "Record_Id"])
		.or_else(|| module_id_field(module).and_then(|field| payload::text_at(payload, field)))
		.unwrap_or_else(|| blake3::hash(document.as_bytes()).to_hex()[..8].to_owned())
}

fn module_id_field(module: Module) -> Option<&'static str> {
	match module {
		Module::Leads => Some("Lead_Id"),
		Module::Contacts => Some("Contact_Id"),
		Module::Accounts => Some("Account_Id"),
		Module::Deals => Some("Deal_Id"),
		Module::Notes => Some("Note_Id"),
		Module::Tasks => Some("Task_Id"),
		Module::Calls => Some("Call_Id"),
		Module::Meetings => Some("Meeting_Id"),
		Module::Projects => Some("Project_Id"),
		Module::Emails => Some("Email_Id"),
		Module::WorkDrive => Some("WorkDrive_Id"),
		Module::Unknown => None,
	}
}

fn document_metadata(
	entity: &str,
	module: Module,
	record_id: &str,
	payload: &Value,
	profile: &IdentityProfile,
) -> Map<String, Value> {
	let mut metadata = Map::new();

	// Scalar payload fields keep their CRM names for lexical scans and
	// structured-field lookups.
	if let Some(object) = payload.as_object() {
		for (key, value) in object {
			match value {
				Value::String(s) if !s.trim().is_empty() => {
					metadata.insert(key.clone(), value.clone());
				},
				Value::Number(_) | Value::Bool(_) => {
					metadata.insert(key.clone(), value.clone());
				},
				_ => {},
			}
		}
	}

	// Canonical identity forms win over whatever casing the payload used.
	if let Some(email) = &profile.email {
		metadata.insert("Email".to_owned(), Value::String(email.clone()));
	}
	if let Some(phone) = &profile.phone {
		metadata.insert("Phone".to_owned(), Value::String(phone.clone()));
	}
	if let Some(address) = &profile.address_line {
		metadata.insert("Address_Line".to_owned(), Value::String(address.clone()));
	}

	metadata.insert("entity".to_owned(), Value::String(entity.to_owned()));
	metadata.insert("module".to_owned(), Value::String(module.as_str().to_owned()));
	metadata.insert("record_id".to_owned(), Value::String(record_id.to_owned()));
	metadata.insert("ingested_at".to_owned(), Value::String(now_rfc3339()));

	metadata
}

pub(crate) fn now_rfc3339() -> String {
	OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
