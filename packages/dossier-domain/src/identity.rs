//! Identity-key derivation.
//!
//! Every CRM record that mentions a person or organization must map to the
//! same stable entity key no matter which module it came from. Keys are
//! picked with a fixed precedence: a lowercased email wins, then phone
//! digits, then a slugged name-and-company with a short content hash so two
//! different "John Smith"s do not share a dossier.

use serde_json::Value;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::payload;

/// Email-bearing fields, checked in order. Raw CRM names come first, the
/// lowercase form covers pre-normalized payloads.
const EMAIL_FIELDS: &[&str] = &[
	"Email",
	"Primary_Email",
	"Contact_Email",
	"Contact.email",
	"Owner.email",
	"Account_Email",
	"Work_Email",
	"email",
];
/// Phone-bearing fields, checked in order.
const PHONE_FIELDS: &[&str] = &[
	"Phone",
	"Mobile",
	"Work_Phone",
	"Home_Phone",
	"Contact_Phone",
	"Contact.mobile",
	"Fax",
	"phone",
	"mobile",
];
const NAME_FIELDS: &[&str] = &["Full_Name", "Name", "Lead_Name", "Contact_Name", "name"];
const COMPANY_FIELDS: &[&str] =
	&["Company", "Account_Name", "Organization", "Org", "Vendor_Name", "company"];
const STREET_FIELDS: &[&str] =
	&["Street", "Mailing_Street", "Address", "Address_Line_1", "Billing_Street"];
const CITY_FIELDS: &[&str] = &["City", "Mailing_City", "Billing_City"];
const STATE_FIELDS: &[&str] = &["State", "Mailing_State", "Billing_State"];
const ZIP_FIELDS: &[&str] = &["Zip_Code", "Mailing_Zip", "Postal_Code", "Billing_Code"];
const COUNTRY_FIELDS: &[&str] = &["Country", "Mailing_Country", "Billing_Country"];
const MAX_SLUG_LEN: usize = 48;

/// Everything the key deriver could learn about the person or organization
/// behind one payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IdentityProfile {
	/// Stable entity key, never empty.
	pub key: String,
	pub name: Option<String>,
	pub company: Option<String>,
	/// Lowercased.
	pub email: Option<String>,
	/// As written in the payload.
	pub phone: Option<String>,
	/// Digits extracted from `phone`, `None` when no digits survive.
	pub phone_digits: Option<String>,
	/// Street-to-country parts joined with `, `.
	pub address_line: Option<String>,
	/// Lowercased name and company variants, deduplicated, derivation order.
	pub aliases: Vec<String>,
}

impl IdentityProfile {
	/// True when the payload carried at least one real identity attribute.
	///
	/// A profile without signals still has a hash key, but it describes
	/// nobody and must not create a directory entry.
	pub fn has_identity_signals(&self) -> bool {
		self.name.is_some()
			|| self.company.is_some()
			|| self.email.is_some()
			|| self.phone.is_some()
			|| self.address_line.is_some()
	}
}

/// Derives the [`IdentityProfile`] for one payload.
///
/// Total: every payload gets a key, even an empty object (which hashes to a
/// stable `unknown-…` key with no signals).
pub fn derive_identity(payload: &Value) -> IdentityProfile {
	let email = pick_email(payload);
	let phone = pick_phone(payload);
	let phone_digits = phone.as_deref().map(digits).filter(|d| !d.is_empty());
	let name = pick_name(payload);
	let company = pick_company(payload);
	let address_line = pick_address_line(payload);
	let key = if let Some(email) = &email {
		email.clone()
	} else if let Some(digits) = &phone_digits {
		digits.clone()
	} else {
		let name_part = name.as_deref().unwrap_or_default();
		let company_part = company.as_deref().unwrap_or_default();
		let base = slug(&format!("{name_part} {company_part}"));
		let base = if base.is_empty() { "unknown" } else { &base };

		format!("{base}-{}", short_hash(&format!("{name_part}\n{company_part}")))
	};
	let aliases = collect_aliases(payload, name.as_deref(), company.as_deref());

	IdentityProfile { key, name, company, email, phone, phone_digits, address_line, aliases }
}

fn pick_email(payload: &Value) -> Option<String> {
	payload::first_text(payload, EMAIL_FIELDS)
		.or_else(|| payload::scan_by_token(payload, "email"))
		.map(|e| e.to_lowercase())
}

fn pick_phone(payload: &Value) -> Option<String> {
	payload::first_text(payload, PHONE_FIELDS)
		.or_else(|| payload::scan_by_token(payload, "phone"))
		.or_else(|| payload::scan_by_token(payload, "mobile"))
}

fn pick_name(payload: &Value) -> Option<String> {
	payload::first_text(payload, NAME_FIELDS).or_else(|| {
		let first = payload::text_at(payload, "First_Name");
		let last = payload::text_at(payload, "Last_Name");
		let joined =
			[first, last].into_iter().flatten().collect::<Vec<_>>().join(" ").trim().to_owned();

		(!joined.is_empty()).then_some(joined)
	})
}

fn pick_company(payload: &Value) -> Option<String> {
	payload::first_text(payload, COMPANY_FIELDS)
}

fn pick_address_line(payload: &Value) -> Option<String> {
	let parts = [STREET_FIELDS, CITY_FIELDS, STATE_FIELDS, ZIP_FIELDS, COUNTRY_FIELDS]
		.into_iter()
		.filter_map(|group| payload::first_text(payload, group))
		.collect::<Vec<_>>();

	(!parts.is_empty()).then(|| parts.join(", "))
}

fn collect_aliases(payload: &Value, name: Option<&str>, company: Option<&str>) -> Vec<String> {
	let mut aliases = Vec::new();
	let mut push = |candidate: Option<String>| {
		let Some(candidate) = candidate else { return };
		let candidate = candidate.trim().to_lowercase();

		if !candidate.is_empty() && !aliases.contains(&candidate) {
			aliases.push(candidate);
		}
	};

	push(name.map(str::to_owned));
	push(company.map(str::to_owned));

	for field in NAME_FIELDS.iter().chain(COMPANY_FIELDS) {
		push(payload::text_at(payload, field));
	}

	aliases
}

/// Keeps the digits of a phone-like string, dropping spacing and punctuation.
pub fn digits(value: &str) -> String {
	value.chars().filter(char::is_ascii_digit).collect()
}

/// Lowercase ASCII slug: diacritics folded away, every non-alphanumeric run
/// collapsed to a single `-`, capped at 48 characters.
pub fn slug(value: &str) -> String {
	let mut out = String::new();

	for c in value.nfkd().filter(|c| !is_combining_mark(*c)) {
		if c.is_ascii_alphanumeric() {
			out.push(c.to_ascii_lowercase());
		} else if !out.is_empty() && !out.ends_with('-') {
			out.push('-');
		}
	}

	out.truncate(MAX_SLUG_LEN);

	out.trim_end_matches('-').to_owned()
}

/// First six hex characters of the BLAKE3 digest, used to disambiguate
/// slug-based keys.
pub fn short_hash(value: &str) -> String {
	blake3::hash(value.as_bytes()).to_hex()[..6].to_owned()
}
