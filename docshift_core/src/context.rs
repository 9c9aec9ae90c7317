use std::collections::BTreeMap;
use std::collections::BTreeSet;

use derive_more::Deref;
use serde_yaml_ng::Value;

use crate::registry::RenameRegistry;

/// Ignore pattern every migrated site starts with: files and folders whose
/// name begins with an underscore are private.
pub const DEFAULT_IGNORE_PATTERN: &str = "**/_*";

/// Ordered glob-like patterns excluded from indexing.
#[derive(Debug, Clone, Deref)]
pub struct IgnoreList(Vec<String>);

impl Default for IgnoreList {
	fn default() -> Self {
		Self(vec![DEFAULT_IGNORE_PATTERN.to_string()])
	}
}

impl IgnoreList {
	/// Append a pattern unless it is already present.
	pub fn push(&mut self, pattern: impl Into<String>) {
		let pattern = pattern.into();
		if !self.0.contains(&pattern) {
			self.0.push(pattern);
		}
	}
}

/// Root-relative folders that hold partial content.
#[derive(Debug, Clone, Default, Deref)]
pub struct PartialFolders(BTreeSet<String>);

impl PartialFolders {
	pub fn insert(&mut self, folder: impl Into<String>) -> bool {
		self.0.insert(folder.into())
	}
}

/// Human-readable follow-up tasks for content that could not be migrated
/// automatically.
#[derive(Debug, Clone, Default, Deref)]
pub struct InstructionsLog(Vec<String>);

impl InstructionsLog {
	pub fn push(&mut self, section: impl Into<String>) {
		self.0.push(section.into());
	}

	/// Render every section into a single markdown report.
	pub fn render(&self) -> String {
		let mut report = String::from("# Migration instructions\n\n");
		report.push_str(
			"The following items could not be migrated automatically and need a manual follow-up.\n",
		);
		for section in &self.0 {
			report.push('\n');
			report.push_str(section.trim_end());
			report.push('\n');
		}
		report
	}
}

/// Source of the API credential used for remote definitions.
pub trait CredentialPrompt {
	/// Ask for a credential. `None` or an empty string means the user declined.
	fn prompt(&mut self) -> Option<String>;
}

/// Ask-once storage for the remote API credential.
///
/// The first call to [`CredentialSlot::get_or_prompt`] asks the
/// [`CredentialPrompt`]; the answer, including a declined one, is kept for the
/// rest of the run.
#[derive(Debug, Clone, Default)]
pub enum CredentialSlot {
	#[default]
	Unprompted,
	Cached(Option<String>),
}

impl CredentialSlot {
	pub fn get_or_prompt(&mut self, prompt: &mut dyn CredentialPrompt) -> Option<&str> {
		if matches!(self, Self::Unprompted) {
			let answer = prompt.prompt().filter(|token| !token.trim().is_empty());
			if answer.is_none() {
				tracing::warn!("no API credential provided, remote definitions will be skipped");
			}
			*self = Self::Cached(answer);
		}

		match self {
			Self::Cached(answer) => answer.as_deref(),
			Self::Unprompted => None,
		}
	}

	pub fn is_prompted(&self) -> bool {
		matches!(self, Self::Cached(_))
	}
}

/// All state that outlives a single file during a migration run.
///
/// Constructed once per run and passed by reference into every phase.
#[derive(Debug, Default)]
pub struct MigrationContext {
	pub registry: RenameRegistry,
	/// Final document path to its opaque permission value.
	pub rbac: BTreeMap<String, Value>,
	pub ignore: IgnoreList,
	pub partial_folders: PartialFolders,
	pub instructions: InstructionsLog,
	pub credential: CredentialSlot,
}

impl MigrationContext {
	pub fn new() -> Self {
		Self::default()
	}
}
