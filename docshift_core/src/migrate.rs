use std::path::Path;

use serde::Serialize;
use serde_yaml_ng::Value;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::config::DocshiftConfig;
use crate::config::LegacySiteConfig;
use crate::config::assemble_site_config;
use crate::config::load_site_config;
use crate::config::merge_site_config;
use crate::context::MigrationContext;
use crate::definitions::RemoteAccess;
use crate::definitions::migrate_definitions;
use crate::formats::convert_formats;
use crate::listing::FileLister;
use crate::listing::normalize_line_endings;
use crate::markup::transform_document;
use crate::navigation::TreeOutput;
use crate::navigation::transform_tree_file;
use crate::paths::relative_key;

pub const DOCUMENT_PATTERN: &str = "**/*.md";
pub const NAVIGATION_PATTERN: &str = "**/sidebars.yaml";
pub const DESCRIPTOR_PATTERN: &str = "**/*.page.yaml";
pub const MDX_PATTERN: &str = "**/*.mdx";
pub const REACT_PAGE_PATTERNS: [&str; 2] = ["**/*.page.tsx", "**/*.page.jsx"];

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
	/// Reference descriptors replaced by their definition file.
	pub definitions_relocated: usize,
	/// Remote definitions downloaded into the project.
	pub definitions_downloaded: usize,
	/// `.mdx` pages renamed to `.md`.
	pub pages_converted: usize,
	pub documents_updated: usize,
	pub trees_updated: usize,
	/// Navigation files that declared several named trees.
	pub trees_split: usize,
	/// Root-relative path of the generated site configuration.
	pub output_config: String,
	/// Root-relative path of the instructions file, when one was written.
	pub instructions: Option<String>,
	pub instruction_count: usize,
}

/// A file whose content would change if the migration ran again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
	pub path: String,
	/// Current content, empty for files that do not exist yet.
	pub current: String,
	pub updated: String,
}

/// Migrate the legacy site rooted at `root` in place.
///
/// Phases run strictly in order. Relocating passes (definitions, formats)
/// finish before any reference is rewritten, so the rename registry is
/// complete by the time documents and navigation trees are processed.
pub fn run_migration(root: &Path, remote: &mut RemoteAccess<'_>) -> DocshiftResult<MigrationReport> {
	let config = DocshiftConfig::load_or_default(root)?;
	let site = LegacySiteConfig::load(root, &config.site_config)?;
	let lister = FileLister::new(root, &config.exclude.patterns)?;
	let mut ctx = MigrationContext::new();
	let mut report = MigrationReport::default();

	site.defer_unmigratable(&mut ctx);

	let descriptors = lister.list(DESCRIPTOR_PATTERN)?;
	let definitions = migrate_definitions(root, &descriptors, &site, &mut ctx, remote)?;
	report.definitions_relocated = definitions.relocated;
	report.definitions_downloaded = definitions.downloaded;
	tracing::info!(
		relocated = definitions.relocated,
		downloaded = definitions.downloaded,
		skipped = definitions.skipped,
		"definitions pass complete"
	);

	let mdx_files = lister.list(MDX_PATTERN)?;
	let mut react_pages = Vec::new();
	for pattern in REACT_PAGE_PATTERNS {
		react_pages.extend(lister.list(pattern)?);
	}
	let formats = convert_formats(root, &mdx_files, &react_pages, &mut ctx)?;
	report.pages_converted = formats.converted;
	tracing::info!(
		converted = formats.converted,
		deferred = formats.deferred,
		"formats pass complete"
	);

	let instructions_key = relative_key(root, &root.join(&config.instructions_file));
	for path in lister.list(DOCUMENT_PATTERN)? {
		if path == instructions_key {
			continue;
		}
		let content = normalize_line_endings(&std::fs::read_to_string(root.join(&path))?);
		if let Some(updated) = transform_document(&content, &path, &mut ctx)? {
			std::fs::write(root.join(&path), updated)?;
			tracing::debug!(path = %path, "updated document");
			report.documents_updated += 1;
		}
	}
	tracing::info!(updated = report.documents_updated, "documents pass complete");

	for path in lister.list(NAVIGATION_PATTERN)? {
		let Some(original) = read_tree(root, &path, &mut ctx)? else {
			continue;
		};
		let outputs = transform_tree_file(root, &original, &path, &mut ctx)?;
		if matches!(original, Value::Mapping(_)) && !outputs.is_empty() {
			report.trees_split += 1;
		}
		for output in outputs.iter().filter(|output| output.changed) {
			std::fs::write(root.join(&output.path), output.to_yaml()?)?;
			tracing::debug!(path = %output.path, "wrote navigation tree");
			report.trees_updated += 1;
		}
	}
	tracing::info!(
		updated = report.trees_updated,
		split = report.trees_split,
		"navigation pass complete"
	);

	let output_path = root.join(&config.output_config);
	let output_key = relative_key(root, &output_path);
	let generated = assemble_site_config(&ctx);
	let site_config = match load_site_config(&output_path, &output_key)? {
		Some(existing) => Value::Mapping(merge_site_config(existing, generated)),
		None => Value::Mapping(generated),
	};
	let yaml = serde_yaml_ng::to_string(&site_config).map_err(|e| {
		DocshiftError::Yaml {
			path: output_key.clone(),
			reason: e.to_string(),
		}
	})?;
	std::fs::write(&output_path, yaml)?;
	report.output_config = output_key;

	report.instruction_count = ctx.instructions.len();
	if !ctx.instructions.is_empty() {
		std::fs::write(
			root.join(&config.instructions_file),
			ctx.instructions.render(),
		)?;
		report.instructions = Some(instructions_key);
	}

	Ok(report)
}

/// Re-run the document and navigation passes in memory and collect every
/// file that would change. An already migrated site yields nothing.
pub fn check_migration(root: &Path) -> DocshiftResult<Vec<PendingChange>> {
	let config = DocshiftConfig::load_or_default(root)?;
	let lister = FileLister::new(root, &config.exclude.patterns)?;
	let mut ctx = MigrationContext::new();
	let mut pending = Vec::new();

	let instructions_key = relative_key(root, &root.join(&config.instructions_file));
	for path in lister.list(DOCUMENT_PATTERN)? {
		if path == instructions_key {
			continue;
		}
		let current = normalize_line_endings(&std::fs::read_to_string(root.join(&path))?);
		if let Some(updated) = transform_document(&current, &path, &mut ctx)? {
			pending.push(PendingChange {
				path,
				current,
				updated,
			});
		}
	}

	for path in lister.list(NAVIGATION_PATTERN)? {
		let Some(original) = read_tree(root, &path, &mut ctx)? else {
			continue;
		};
		let outputs = transform_tree_file(root, &original, &path, &mut ctx)?;
		for output in outputs.into_iter().filter(|output| output.changed) {
			pending.push(pending_tree_change(root, &output)?);
		}
	}

	tracing::info!(pending = pending.len(), "check complete");
	Ok(pending)
}

fn pending_tree_change(root: &Path, output: &TreeOutput) -> DocshiftResult<PendingChange> {
	let target = root.join(&output.path);
	let current = if target.is_file() {
		normalize_line_endings(&std::fs::read_to_string(target)?)
	} else {
		String::new()
	};

	Ok(PendingChange {
		path: output.path.clone(),
		current,
		updated: output.to_yaml()?,
	})
}

/// Read and parse a navigation file. Unparseable files are logged and
/// skipped.
fn read_tree(root: &Path, path: &str, ctx: &mut MigrationContext) -> DocshiftResult<Option<Value>> {
	let content = std::fs::read_to_string(root.join(path))?;
	match serde_yaml_ng::from_str::<Value>(&content) {
		Ok(value) => Ok(Some(value)),
		Err(e) => {
			tracing::warn!(path, "skipping unparseable navigation file: {e}");
			ctx.instructions.push(format!(
				"## Navigation `{path}`\n\nThe file could not be parsed ({e}) and was left \
				 unchanged.\n"
			));
			Ok(None)
		}
	}
}
