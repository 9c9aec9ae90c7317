use std::collections::BTreeMap;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::paths::normalize_path;

/// Run-scoped mapping from a file's original root-relative path to the path
/// it was relocated to.
///
/// Keys and lookups share the same normalization so `./docs\a.md` and
/// `docs/a.md` address the same entry. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct RenameRegistry {
	entries: BTreeMap<String, String>,
}

impl RenameRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `original` now lives at `new`.
	///
	/// Recording the same original twice means two passes disagree about the
	/// layout of the tree and is reported as a fatal
	/// [`DocshiftError::RegistryCollision`].
	pub fn record(&mut self, original: &str, new: &str) -> DocshiftResult<()> {
		let key = registry_key(original);
		let value = registry_key(new);

		if let Some(existing) = self.entries.get(&key) {
			return Err(DocshiftError::RegistryCollision {
				original: key,
				first: existing.clone(),
				second: value,
			});
		}

		tracing::debug!(original = %key, new = %value, "recorded rename");
		self.entries.insert(key, value);
		Ok(())
	}

	/// Look up where `original` was relocated to.
	pub fn resolve(&self, original: &str) -> Option<&str> {
		self.entries
			.get(&registry_key(original))
			.map(String::as_str)
	}

	/// All `(original, new)` pairs in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries
			.iter()
			.map(|(key, value)| (key.as_str(), value.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

fn registry_key(path: &str) -> String {
	normalize_path(path).unwrap_or_else(|| path.replace('\\', "/"))
}
