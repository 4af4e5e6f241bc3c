//! Hybrid ask planner.
//!
//! Answers one question about one entity. The pipeline is a fixed state
//! machine; the first applicable branch ends it:
//!
//! 1. rewrite the question when the request carries prior turns,
//! 2. vector recall from the entity partition,
//! 3. lexical widening over a bounded partition dump,
//! 4. blend both hit lists,
//! 5. structured-field shortcut straight from metadata,
//! 6. grounded generation, or the fixed no-context answer.
//!
//! Only stage 6 spends a completion call; the shortcuts exist so that
//! "what's the deal amount" style questions stay cheap and exact.

use std::collections::HashSet;

use serde_json::{Map, Value};

use dossier_domain::partition_name;
use dossier_providers::chat_message;
use dossier_store::FetchRequest;

use crate::{DossierService, Error, Result};

const REWRITE_TEMPERATURE: f32 = 0.;
const ANSWER_TEMPERATURE: f32 = 0.2;
const ANSWER_SYSTEM_PROMPT: &str = "You are a CRM assistant. Answer ONLY using the provided \
	Context. If the answer is not in Context, say you don't have that information and suggest \
	what to capture next. Be concise. Use numbers and bullet points when helpful.";
const NO_CONTEXT_ANSWER: &str = "No CRM records are indexed for this entity yet, so there is \
	nothing to answer from. Ingest records for this entity first.";

/// Field-synonym groups for the structured shortcut, matched in order.
const FIELD_GROUPS: &[FieldGroup] = &[
	FieldGroup {
		label: "Amount",
		triggers: &["amount", "price", "worth", "value", "cost"],
		fields: &["Amount"],
	},
	FieldGroup {
		label: "Stage",
		triggers: &["stage", "status"],
		fields: &["Stage", "Lead_Status", "Status"],
	},
	FieldGroup {
		label: "Address",
		triggers: &["address", "street", "city", "located", "location"],
		fields: &["Address_Line", "Address", "Mailing_Street", "Street", "City"],
	},
	FieldGroup { label: "Email", triggers: &["email"], fields: &["Email"] },
	FieldGroup {
		label: "Phone",
		triggers: &["phone", "mobile", "number", "call"],
		fields: &["Phone", "Mobile"],
	},
	FieldGroup {
		label: "File link",
		triggers: &["file", "link", "url", "document", "attachment"],
		fields: &["Url", "url", "Link"],
	},
];

struct FieldGroup {
	label: &'static str,
	triggers: &'static [&'static str],
	fields: &'static [&'static str],
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AskRequest {
	#[serde(default)]
	pub entity: String,
	#[serde(default)]
	pub question: String,
	pub top_k: Option<u32>,
	#[serde(default)]
	pub history: Vec<Turn>,
}

/// One prior conversation turn, forwarded verbatim to the rewriter.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Turn {
	pub role: String,
	pub content: String,
}

/// How the planner arrived at the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
	Structured,
	FieldMissing,
	Generated,
	NoContext,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AskSource {
	pub id: String,
	pub module: String,
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub distance: Option<f32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AskOutcome {
	pub entity: String,
	pub question: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rewritten_question: Option<String>,
	pub answer: String,
	pub mode: AnswerMode,
	pub sources: Vec<AskSource>,
}

/// A blended retrieval hit. `distance` is set only for vector recall.
#[derive(Debug, Clone)]
struct Snippet {
	id: String,
	text: String,
	metadata: Map<String, Value>,
	distance: Option<f32>,
}

impl DossierService {
	pub async fn ask(&self, request: AskRequest) -> Result<AskOutcome> {
		let entity = request.entity.trim().to_owned();
		let question = request.question.trim().to_owned();

		if entity.is_empty() {
			return Err(Error::validation("entity is required"));
		}
		if question.is_empty() {
			return Err(Error::validation("question is required"));
		}

		let rewritten = if request.history.is_empty() {
			None
		} else {
			self.rewrite_question(&request.history, &entity, &question).await
		};
		let effective = rewritten.as_deref().unwrap_or(&question);
		let top_k =
			request.top_k.filter(|k| *k > 0).unwrap_or(self.cfg.retrieval.top_k);
		let partition = self.store.ensure_partition(&partition_name(&entity)).await?;
		let embedding = self.embed_one(effective).await?;
		let recalled = self.store.query(&partition, embedding, top_k, None).await?;
		let vector_hits = snippets_from_query(
			recalled.ids,
			recalled.documents,
			recalled.metadatas,
			recalled.distances,
		);
		let dump = self
			.store
			.fetch(
				&partition,
				FetchRequest {
					limit: Some(self.cfg.retrieval.lexical_scan_limit),
					..Default::default()
				},
			)
			.await?;
		let needle = effective.to_lowercase();
		let lexical_hits = snippets_from_fetch(dump.ids, dump.documents, dump.metadatas)
			.into_iter()
			.filter(|snippet| matches_lexically(&snippet.text, &snippet.metadata, &needle))
			.collect();
		let blended =
			blend(vector_hits, lexical_hits, self.cfg.retrieval.context_limit as usize);

		if let Some(outcome) = structured_answer(effective, &blended) {
			return Ok(AskOutcome {
				entity,
				question,
				rewritten_question: rewritten,
				answer: outcome.answer,
				mode: outcome.mode,
				sources: outcome.sources,
			});
		}

		if blended.is_empty() {
			return Ok(AskOutcome {
				entity,
				question,
				rewritten_question: rewritten,
				answer: NO_CONTEXT_ANSWER.to_owned(),
				mode: AnswerMode::NoContext,
				sources: Vec::new(),
			});
		}

		let answer = self.grounded_answer(effective, &context_block(&blended)).await?;

		Ok(AskOutcome {
			entity,
			question,
			rewritten_question: rewritten,
			answer,
			mode: AnswerMode::Generated,
			sources: blended.into_iter().map(into_source).collect(),
		})
	}

	/// Collapses a follow-up into a standalone question. Any failure falls
	/// back to the question as asked.
	async fn rewrite_question(
		&self,
		history: &[Turn],
		entity: &str,
		question: &str,
	) -> Option<String> {
		let system = format!(
			"You are a query rewriter. Given prior turns and a follow-up, produce a single, \
			explicit question.\nAlways include the entity key: {entity}.\nKeep CRM terms \
			(Deals, Leads, Stage, Amount, Notes, WorkDrive).\nReturn ONLY the rewritten \
			question text."
		);
		let mut messages = vec![chat_message("system", &system)];

		for turn in history {
			messages.push(chat_message(&turn.role, &turn.content));
		}

		messages.push(chat_message("user", question));

		match self
			.providers
			.completion
			.complete(&self.cfg.providers.completion, &messages, REWRITE_TEMPERATURE)
			.await
		{
			Ok(text) => {
				let text = text.trim();

				(!text.is_empty() && text != question).then(|| text.to_owned())
			},
			Err(err) => {
				tracing::debug!(error = %err, "query rewrite failed, using the question as asked");

				None
			},
		}
	}

	async fn grounded_answer(&self, question: &str, context: &str) -> Result<String> {
		let user = format!("Question: {question}\n\nContext:\n{context}");
		let messages = [chat_message("system", ANSWER_SYSTEM_PROMPT), chat_message("user", &user)];

		self.providers
			.completion
			.complete(&self.cfg.providers.completion, &messages, ANSWER_TEMPERATURE)
			.await
			.map_err(Error::completion)
	}
}

fn snippets_from_query(
	ids: Vec<String>,
	documents: Vec<String>,
	metadatas: Vec<Map<String, Value>>,
	distances: Vec<f32>,
) -> Vec<Snippet> {
	let mut documents = documents.into_iter();
	let mut metadatas = metadatas.into_iter();
	let mut distances = distances.into_iter();

	ids.into_iter()
		.map(|id| Snippet {
			id,
			text: documents.next().unwrap_or_default(),
			metadata: metadatas.next().unwrap_or_default(),
			distance: distances.next(),
		})
		.collect()
}

fn snippets_from_fetch(
	ids: Vec<String>,
	documents: Vec<String>,
	metadatas: Vec<Map<String, Value>>,
) -> Vec<Snippet> {
	let mut documents = documents.into_iter();
	let mut metadatas = metadatas.into_iter();

	ids.into_iter()
		.map(|id| Snippet {
			id,
			text: documents.next().unwrap_or_default(),
			metadata: metadatas.next().unwrap_or_default(),
			distance: None,
		})
		.collect()
}

/// True when the document text or any string metadata value contains the
/// question, case-insensitively.
fn matches_lexically(document: &str, metadata: &Map<String, Value>, needle: &str) -> bool {
	document.to_lowercase().contains(needle)
		|| metadata
			.values()
			.any(|value| value.as_str().is_some_and(|s| s.to_lowercase().contains(needle)))
}

/// Vector hits first in their distance order, lexical-only hits appended in
/// dump order, deduplicated by id, truncated to the context cap.
fn blend(vector: Vec<Snippet>, lexical: Vec<Snippet>, cap: usize) -> Vec<Snippet> {
	let mut blended: Vec<Snippet> = Vec::new();

	for snippet in vector.into_iter().chain(lexical) {
		if blended.iter().any(|seen| seen.id == snippet.id) {
			continue;
		}

		blended.push(snippet);
	}

	blended.truncate(cap);

	blended
}

struct ShortcutOutcome {
	answer: String,
	mode: AnswerMode,
	sources: Vec<AskSource>,
}

/// Answers field questions straight from blended metadata, without a
/// completion call. Returns `None` when no field group matches the question.
fn structured_answer(question: &str, blended: &[Snippet]) -> Option<ShortcutOutcome> {
	let lowered = question.to_lowercase();
	let tokens = lowered
		.split(|c: char| !c.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.collect::<HashSet<_>>();
	let group = FIELD_GROUPS
		.iter()
		.find(|group| group.triggers.iter().any(|trigger| tokens.contains(trigger)))?;
	let mut values: Vec<(String, usize)> = Vec::new();

	for (index, snippet) in blended.iter().enumerate() {
		let found = group
			.fields
			.iter()
			.find_map(|field| snippet.metadata.get(*field).and_then(scalar_text));

		if let Some(value) = found {
			if !values.iter().any(|(seen, _)| *seen == value) {
				values.push((value, index));
			}
		}
	}

	if values.is_empty() {
		return Some(ShortcutOutcome {
			answer: format!(
				"No {} is recorded for this entity yet.",
				group.label.to_lowercase()
			),
			mode: AnswerMode::FieldMissing,
			sources: Vec::new(),
		});
	}

	let answer = if let [(value, index)] = values.as_slice() {
		format!("{}: {value} (source: {})", group.label, blended[*index].id)
	} else {
		let mut lines = vec![format!("{}:", group.label)];

		for (value, index) in &values {
			lines.push(format!("- {value} (source: {})", blended[*index].id));
		}

		lines.join("\n")
	};
	let sources = values
		.iter()
		.map(|(_, index)| into_source(blended[*index].clone()))
		.collect();

	Some(ShortcutOutcome { answer, mode: AnswerMode::Structured, sources })
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => {
			let s = s.trim();

			(!s.is_empty()).then(|| s.to_owned())
		},
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn snippet_module(metadata: &Map<String, Value>) -> String {
	metadata
		.get("module")
		.or_else(|| metadata.get("Module"))
		.and_then(Value::as_str)
		.unwrap_or("Record")
		.to_owned()
}

fn into_source(snippet: Snippet) -> AskSource {
	AskSource {
		module: snippet_module(&snippet.metadata),
		id: snippet.id,
		text: snippet.text,
		distance: snippet.distance,
	}
}

/// Numbered context block fed to the completion provider. Each snippet's
/// text already opens with its module line.
fn context_block(snippets: &[Snippet]) -> String {
	snippets
		.iter()
		.enumerate()
		.map(|(index, snippet)| format!("# Source {}\nID: {}\n{}", index + 1, snippet.id, snippet.text))
		.collect::<Vec<_>>()
		.join("\n\n")
}
