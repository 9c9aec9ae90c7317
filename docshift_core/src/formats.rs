//! Conversion of legacy document formats into plain markdown.
//!
//! `.mdx` pages that turn out to be ordinary markdown are renamed to `.md`.
//! Pages that really use components, and React pages, are left for a human.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::DocshiftResult;
use crate::context::MigrationContext;
use crate::fences::FenceTracker;
use crate::fences::LineKind;

/// ESM statements at the start of a line.
static ESM_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(?:import|export)\s").unwrap());

/// Opening or self-closing tag of a capitalized component.
static COMPONENT_TAG_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"</?[A-Z][A-Za-z0-9_.]*[\s/>]").unwrap());

/// Counts for the formats pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatsSummary {
	pub converted: usize,
	pub deferred: usize,
}

/// Whether an `.mdx` document uses nothing beyond markdown. Content inside
/// code fences is not inspected.
pub fn is_plain_markdown(text: &str) -> bool {
	let mut fences = FenceTracker::default();

	for line in text.lines() {
		if fences.classify(line) != LineKind::Prose {
			continue;
		}

		if ESM_RE.is_match(line) || COMPONENT_TAG_RE.is_match(line) {
			return false;
		}
	}

	true
}

/// Convert every `.mdx` page in `mdx_files` and log every React page in
/// `react_pages`. All paths are root-relative.
pub fn convert_formats(
	root: &Path,
	mdx_files: &[String],
	react_pages: &[String],
	ctx: &mut MigrationContext,
) -> DocshiftResult<FormatsSummary> {
	let mut summary = FormatsSummary::default();

	for path in mdx_files {
		let Some(stem) = path.strip_suffix(".mdx") else {
			continue;
		};
		let target = format!("{stem}.md");

		let content = std::fs::read_to_string(root.join(path))?;
		if !is_plain_markdown(&content) {
			tracing::debug!(path = %path, "mdx page uses components");
			ctx.instructions.push(format!(
				"## Page `{path}`\n\nThis MDX page uses imports or components. Rewrite them with \
				 Markdoc tags and rename the file to `{target}`.\n"
			));
			summary.deferred += 1;
			continue;
		}

		if root.join(&target).exists() {
			tracing::warn!(path = %path, target = %target, "conversion target already exists");
			ctx.instructions.push(format!(
				"## Page `{path}`\n\nCould not be renamed because `{target}` already exists. Merge \
				 the two pages by hand.\n"
			));
			summary.deferred += 1;
			continue;
		}

		std::fs::rename(root.join(path), root.join(&target))?;
		ctx.registry.record(path, &target)?;
		tracing::debug!(from = %path, to = %target, "converted mdx page");
		summary.converted += 1;
	}

	for path in react_pages {
		tracing::debug!(path = %path, "deferring react page");
		ctx.instructions.push(format!(
			"## Page `{path}`\n\nReact pages are not migrated automatically. Re-create this page \
			 as markdown or as a custom React page in the new project.\n"
		));
		summary.deferred += 1;
	}

	Ok(summary)
}
