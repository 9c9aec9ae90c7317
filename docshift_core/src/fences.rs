//! Fenced code block tracking. Text rewrites leave fenced content alone.

use std::sync::LazyLock;

use regex::Regex;

/// A run of three or more backticks or tildes, then the info string.
static FENCE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*(`{3,}|~{3,})(.*)$").unwrap());

/// Where a line sits relative to fenced code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
	Prose,
	/// The opening fence line, info string included.
	Opening,
	Fenced,
	Closing,
}

/// Classifies lines one at a time, in document order.
#[derive(Debug, Clone, Default)]
pub struct FenceTracker {
	open: Option<(char, usize)>,
}

impl FenceTracker {
	pub fn classify(&mut self, line: &str) -> LineKind {
		let line = line.trim_end_matches(['\n', '\r']);
		let marker = FENCE_RE.captures(line);

		match (self.open, marker) {
			(None, Some(caps)) => {
				let fence = &caps[1];
				let ch = if fence.starts_with('`') { '`' } else { '~' };
				// A backtick info string cannot hold backticks; that is inline code.
				if ch == '`' && caps[2].contains('`') {
					return LineKind::Prose;
				}
				self.open = Some((ch, fence.len()));
				LineKind::Opening
			}
			(Some((ch, len)), Some(caps))
				if caps[1].starts_with(ch) && caps[1].len() >= len && caps[2].trim().is_empty() =>
			{
				self.open = None;
				LineKind::Closing
			}
			(Some(_), _) => LineKind::Fenced,
			(None, None) => LineKind::Prose,
		}
	}
}

/// Apply `rewrite` to every run of prose lines in `text`. Fence lines and
/// fenced content are copied through unchanged.
pub fn map_outside_fences(text: &str, mut rewrite: impl FnMut(&str) -> String) -> String {
	let mut tracker = FenceTracker::default();
	let mut result = String::with_capacity(text.len());
	let mut prose_start: Option<usize> = None;
	let mut offset = 0;

	for line in text.split_inclusive('\n') {
		if tracker.classify(line) == LineKind::Prose {
			prose_start.get_or_insert(offset);
		} else {
			if let Some(start) = prose_start.take() {
				result.push_str(&rewrite(&text[start..offset]));
			}
			result.push_str(line);
		}
		offset += line.len();
	}

	if let Some(start) = prose_start {
		result.push_str(&rewrite(&text[start..]));
	}

	result
}
