//! Field access over raw CRM payloads.
//!
//! Payloads arrive as arbitrary JSON objects whose field names vary by CRM
//! module and tenant customization. These helpers centralize the lookup
//! rules: dotted paths descend into nested objects, scalar values coerce to
//! trimmed text, and token scans catch tenant-specific field names the
//! candidate lists do not know about.

use serde_json::Value;

/// Looks up a possibly dotted path such as `Contact.email`.
///
/// Each segment descends one object level. Returns `None` as soon as a
/// segment is missing or the current value is not an object.
pub fn get_path<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
	path.split('.').try_fold(payload, |value, segment| value.as_object()?.get(segment))
}

/// Coerces the value at `path` to trimmed non-empty text.
///
/// Strings are trimmed, numbers are rendered as written. Booleans, nulls,
/// arrays and objects never count as text.
pub fn text_at(payload: &Value, path: &str) -> Option<String> {
	as_text(get_path(payload, path)?)
}

pub fn as_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => {
			let s = s.trim();

			(!s.is_empty()).then(|| s.to_owned())
		},
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Returns the first candidate path that yields text.
pub fn first_text(payload: &Value, candidates: &[&str]) -> Option<String> {
	candidates.iter().find_map(|path| text_at(payload, path))
}

/// Scans top-level fields whose lowercased name contains `token` and returns
/// the first string value found.
///
/// This is the fallback behind the explicit candidate lists; field iteration
/// order is the deterministic key order of the payload object.
pub fn scan_by_token(payload: &Value, token: &str) -> Option<String> {
	let object = payload.as_object()?;

	object.iter().find_map(|(key, value)| {
		if !key.to_lowercase().contains(token) {
			return None;
		}

		match value {
			Value::String(s) => {
				let s = s.trim();

				(!s.is_empty()).then(|| s.to_owned())
			},
			_ => None,
		}
	})
}

/// Loose presence test used by module sniffing.
///
/// A field counts as present when it exists and is not null, an empty or
/// blank string, or `false`.
pub fn has_field(payload: &Value, field: &str) -> bool {
	match get_path(payload, field) {
		Some(Value::Null) => false,
		Some(Value::String(s)) => !s.trim().is_empty(),
		Some(Value::Bool(b)) => *b,
		Some(_) => true,
		None => false,
	}
}
