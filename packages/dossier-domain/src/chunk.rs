//! Word-window chunking for file text.

/// Splits `text` into overlapping word windows.
///
/// Windows are `window` words wide and advance by `window - overlap` words,
/// so consecutive chunks share `overlap` words of context. Blank input
/// yields no chunks; a degenerate `overlap >= window` still advances one
/// word per step instead of looping.
pub fn word_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
	let words = text.split_whitespace().collect::<Vec<_>>();

	if words.is_empty() || window == 0 {
		return Vec::new();
	}

	let step = window.saturating_sub(overlap).max(1);
	let mut chunks = Vec::new();
	let mut start = 0;

	loop {
		let end = (start + window).min(words.len());

		chunks.push(words[start..end].join(" "));

		if end == words.len() {
			break;
		}

		start += step;
	}

	chunks
}
