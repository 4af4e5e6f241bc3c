//! Directory search behind `/v1/entities/search` and typeahead.
//!
//! Every card in the shared directory partition is scored by weighted field
//! containment, then one vector query appends semantic-only matches the
//! scoring missed. Counts enrichment is best-effort per hit.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use dossier_domain::{DIRECTORY_PARTITION, identity::digits, partition_name};
use dossier_store::FetchRequest;

use crate::{DossierService, Result};

const DEFAULT_MATCH_LIMIT: usize = 8;
const WEIGHT_PHONE_DIGITS: u32 = 12;
const WEIGHT_EMAIL: u32 = 10;
const WEIGHT_NAME: u32 = 9;
const WEIGHT_COMPANY: u32 = 7;
const WEIGHT_ADDRESS: u32 = 6;
const WEIGHT_PHONE: u32 = 6;
const WEIGHT_NAME_PREFIX: u32 = 5;
const MIN_PREFIX_TERM_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct SearchRequest {
	pub term: String,
	pub limit: Option<u32>,
	pub include_counts: bool,
}

/// Which stage produced a match: field scoring or vector recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchProvenance {
	Fields,
	Vector,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityMatch {
	pub entity: String,
	pub name: String,
	pub company: String,
	pub email: String,
	pub phone: String,
	pub score: u32,
	/// Which card fields contained the term, in weight order.
	pub hits: Vec<String>,
	pub provenance: MatchProvenance,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub distance: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub modules: Option<BTreeMap<String, u32>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResponse {
	pub term: String,
	pub matches: Vec<EntityMatch>,
}

impl DossierService {
	pub async fn search_entities(&self, request: SearchRequest) -> Result<SearchResponse> {
		let term = normalize_term(&request.term);

		if term.is_empty() {
			return Ok(SearchResponse { term, matches: Vec::new() });
		}

		let term_digits = digits(&request.term);
		let limit = request
			.limit
			.filter(|l| *l > 0)
			.map(|l| l as usize)
			.unwrap_or(DEFAULT_MATCH_LIMIT);
		let directory = self.store.ensure_partition(DIRECTORY_PARTITION).await?;
		let dump = self
			.store
			.fetch(
				&directory,
				FetchRequest {
					limit: Some(self.cfg.retrieval.directory_scan_limit),
					..Default::default()
				},
			)
			.await?;
		let mut matches: Vec<EntityMatch> = Vec::new();

		for (id, metadata) in dump.ids.into_iter().zip(dump.metadatas) {
			if let Some((score, hits)) = score_card(&metadata, &term, &term_digits) {
				matches.push(match_from_card(id, &metadata, score, hits, MatchProvenance::Fields, None));
			}
		}

		rank_matches(&mut matches);

		let embedding = self.embed_one(&term).await?;
		let recalled = self
			.store
			.query(&directory, embedding, self.cfg.retrieval.directory_recall_k, None)
			.await?;
		let mut distances = recalled.distances.into_iter();

		for (id, metadata) in recalled.ids.into_iter().zip(recalled.metadatas) {
			let distance = distances.next();
			let entity = card_entity(&metadata, &id);

			if matches.iter().any(|found| found.entity == entity) {
				continue;
			}

			matches.push(match_from_card(
				id,
				&metadata,
				0,
				Vec::new(),
				MatchProvenance::Vector,
				distance,
			));
		}

		matches.truncate(limit);

		if request.include_counts {
			for found in &mut matches {
				found.modules = self.module_counts(&found.entity).await;
			}
		}

		Ok(SearchResponse { term, matches })
	}

	/// Typeahead is plain search with counts always on.
	pub async fn typeahead(&self, term: String, limit: Option<u32>) -> Result<SearchResponse> {
		self.search_entities(SearchRequest { term, limit, include_counts: true }).await
	}

	async fn module_counts(&self, entity: &str) -> Option<BTreeMap<String, u32>> {
		match self.sample_module_counts(entity).await {
			Ok(counts) => Some(counts),
			Err(err) => {
				tracing::debug!(entity = %entity, error = %err, "module count enrichment failed");

				None
			},
		}
	}

	async fn sample_module_counts(&self, entity: &str) -> Result<BTreeMap<String, u32>> {
		let partition = self.store.ensure_partition(&partition_name(entity)).await?;
		let sample = self
			.store
			.fetch(
				&partition,
				FetchRequest {
					limit: Some(self.cfg.retrieval.module_count_sample),
					..Default::default()
				},
			)
			.await?;
		let mut counts = BTreeMap::new();

		for metadata in &sample.metadatas {
			let module = metadata
				.get("module")
				.or_else(|| metadata.get("Module"))
				.and_then(Value::as_str)
				.unwrap_or("Record");

			*counts.entry(module.to_owned()).or_insert(0) += 1;
		}

		Ok(counts)
	}
}

fn normalize_term(term: &str) -> String {
	term.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Weighted containment over one directory card. `None` when nothing scored.
fn score_card(
	card: &Map<String, Value>,
	term: &str,
	term_digits: &str,
) -> Option<(u32, Vec<String>)> {
	let name = card_field(card, "name");
	let company = card_field(card, "company");
	let email = card_field(card, "email");
	let phone = card_field(card, "phone");
	let address = card_field(card, "address_line");
	let phone_digits = {
		let stored = card_field(card, "phone_digits");

		if stored.is_empty() { digits(&phone) } else { stored }
	};
	let mut score = 0;
	let mut hits = Vec::new();

	if !term_digits.is_empty()
		&& !phone_digits.is_empty()
		&& phone_digits.contains(term_digits)
	{
		score += WEIGHT_PHONE_DIGITS;

		hits.push("phone digits");
	}
	if contains(&email, term) {
		score += WEIGHT_EMAIL;

		hits.push("email");
	}
	if contains(&name, term) {
		score += WEIGHT_NAME;

		hits.push("name");
	}
	if contains(&company, term) {
		score += WEIGHT_COMPANY;

		hits.push("company");
	}
	if contains(&address, term) {
		score += WEIGHT_ADDRESS;

		hits.push("address");
	}
	if contains(&phone, term) {
		score += WEIGHT_PHONE;

		hits.push("phone");
	}
	if score == 0
		&& term.len() >= MIN_PREFIX_TERM_LEN
		&& name.to_lowercase().split_whitespace().any(|token| token.starts_with(term))
	{
		score = WEIGHT_NAME_PREFIX;

		hits.push("name prefix");
	}

	(score > 0).then(|| (score, hits.into_iter().map(str::to_owned).collect()))
}

/// Score descending, ties by company ascending. Stable, so equal keys keep
/// directory dump order.
fn rank_matches(matches: &mut [EntityMatch]) {
	matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.company.cmp(&b.company)));
}

fn match_from_card(
	id: String,
	card: &Map<String, Value>,
	score: u32,
	hits: Vec<String>,
	provenance: MatchProvenance,
	distance: Option<f32>,
) -> EntityMatch {
	EntityMatch {
		entity: card_entity(card, &id),
		name: card_field(card, "name"),
		company: card_field(card, "company"),
		email: card_field(card, "email"),
		phone: card_field(card, "phone"),
		score,
		hits,
		provenance,
		distance,
		modules: None,
	}
}

// Card ids are entity keys; the metadata copy wins when both exist.
fn card_entity(card: &Map<String, Value>, id: &str) -> String {
	let stored = card_field(card, "entity");

	if stored.is_empty() { id.to_owned() } else { stored }
}

fn card_field(card: &Map<String, Value>, key: &str) -> String {
	card.get(key).and_then(Value::as_str).map(str::trim).unwrap_or_default().to_owned()
}

fn contains(haystack: &str, needle: &str) -> bool {
	!haystack.is_empty() && haystack.to_lowercase().contains(needle)
}
