//! Partition naming.
//!
//! Every entity gets its own vector-store partition. Backends constrain
//! collection names (lowercase alphanumerics plus `-` and `_`, 63 chars,
//! alphanumeric first and last character), so the mapping from entity key to
//! partition name has to be total and stay injective for realistic keys.

use crate::identity::short_hash;

/// Partition holding one directory card per known entity.
pub const DIRECTORY_PARTITION: &str = "entity_directory";
/// Longest collection name the backends accept.
pub const MAX_PARTITION_NAME_LEN: usize = 63;
const PARTITION_PREFIX: &str = "entity_";
/// Sanitized keys longer than this get truncated and hash-suffixed.
const MAX_KEY_LEN: usize = 48;

/// Maps an entity key to its partition name.
///
/// Total over arbitrary input: keys that sanitize to nothing fall back to a
/// pure hash name, keys that sanitize too long keep a prefix plus a hash so
/// distinct long keys stay distinct.
pub fn partition_name(entity_key: &str) -> String {
	let sanitized = sanitize(entity_key);
	let safe = if sanitized.is_empty() {
		format!("e-{}", short_hash(entity_key))
	} else if sanitized.len() > MAX_KEY_LEN {
		// 41 prefix chars + "-" + 6 hash chars stays within MAX_KEY_LEN.
		let head = sanitized[..MAX_KEY_LEN - 7].trim_end_matches('-');

		format!("{head}-{}", short_hash(entity_key))
	} else {
		sanitized
	};
	let mut name = format!("{PARTITION_PREFIX}{safe}");

	name.truncate(MAX_PARTITION_NAME_LEN);

	while name.ends_with(['-', '_']) {
		name.pop();
	}

	name
}

/// Lowercases and keeps `[a-z0-9]`, collapsing every other run to one `-`.
/// Unlike the key slug this is unbounded; the caller handles length.
fn sanitize(value: &str) -> String {
	let mut out = String::new();

	for c in value.chars() {
		if c.is_ascii_alphanumeric() {
			out.push(c.to_ascii_lowercase());
		} else if !out.is_empty() && !out.ends_with('-') {
			out.push('-');
		}
	}

	out.trim_end_matches('-').to_owned()
}
