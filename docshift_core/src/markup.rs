//! Text-to-text rewriting of legacy markup into Markdoc tags.
//!
//! Legacy constructs are regular enough to be found with patterns over the
//! raw text, so no markdown parser is involved:
//!
//! - `:::type Title` admonitions become `{% admonition %}` blocks.
//! - `<embed src="..." />` becomes `{% partial /%}`.
//! - Code fences with a free-text title after the language get a
//!   `{% title="..." %}` attribute.

use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use crate::DocshiftResult;
use crate::context::MigrationContext;
use crate::context::PartialFolders;
use crate::fences::FenceTracker;
use crate::fences::LineKind;
use crate::fences::map_outside_fences;
use crate::frontmatter::process_frontmatter;
use crate::frontmatter::splice_frontmatter;
use crate::links::rewrite_links;
use crate::paths::parent_dir;
use crate::paths::resolve_reference;

/// `:::type optional title` on a line of its own.
static ADMONITION_OPEN_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^:::([A-Za-z][\w-]*)[ \t]*(.*)$").unwrap());

static ADMONITION_CLOSE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^:::[ \t]*$").unwrap());

const ADMONITION_CLOSE_TAG: &str = "{% /admonition %}";

static EMBED_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"<embed\s+src\s*=\s*(?:"([^"]*)"|'([^']*)')\s*/>"#).unwrap()
});

/// Opening fence, language tag, then a title that does not already start
/// with a Markdoc attribute.
static TITLED_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?m)^([ \t]*)(`{3,}|~{3,})([\w+#.-]+)[ \t]+([^\s{][^\n]*?)[ \t]*$").unwrap()
});

static TITLE_ATTRIBUTE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"^title=(?:"([^"]*)"|'([^']*)')$"#).unwrap());

/// Legacy admonition types that were renamed.
fn normalize_admonition_type(kind: &str) -> String {
	match kind.to_ascii_lowercase().as_str() {
		"attention" => "info".to_string(),
		other => other.to_string(),
	}
}

fn escape_attribute(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Rewrite `:::type Title` blocks into admonition tags.
///
/// Blocks nest, and a block left open at the end of the document is closed
/// there. `:::` lines inside code fences are not markup.
pub fn rewrite_admonitions(text: &str) -> String {
	let mut fences = FenceTracker::default();
	let mut result = String::with_capacity(text.len());
	let mut open_blocks = 0usize;

	for line in text.split_inclusive('\n') {
		if fences.classify(line) != LineKind::Prose {
			result.push_str(line);
			continue;
		}

		let (content, newline) = line
			.strip_suffix('\n')
			.map_or((line, ""), |content| (content, "\n"));

		if let Some(caps) = ADMONITION_OPEN_RE
			.captures(content)
			.filter(|_| !newline.is_empty())
		{
			let kind = normalize_admonition_type(&caps[1]);
			let title = caps[2].trim();
			result.push_str(&format!("{{% admonition type=\"{kind}\""));
			if !title.is_empty() {
				result.push_str(&format!(" name=\"{}\"", escape_attribute(title)));
			}
			result.push_str(" %}\n");
			open_blocks += 1;
		} else if open_blocks > 0 && ADMONITION_CLOSE_RE.is_match(content) {
			result.push_str(ADMONITION_CLOSE_TAG);
			result.push_str(newline);
			open_blocks -= 1;
		} else {
			result.push_str(line);
		}
	}

	for _ in 0..open_blocks {
		if !result.ends_with('\n') {
			result.push('\n');
		}
		result.push_str(ADMONITION_CLOSE_TAG);
	}

	result
}

/// Rewrite `<embed src="..." />` into partial tags, recording the folder of
/// every embedded file.
pub fn rewrite_embeds(text: &str, path: &str, partial_folders: &mut PartialFolders) -> String {
	EMBED_RE
		.replace_all(text, |caps: &Captures| {
			let src = caps
				.get(1)
				.or_else(|| caps.get(2))
				.map_or("", |m| m.as_str());

			match resolve_reference(path, src) {
				Some(resolved) => {
					let folder = parent_dir(&resolved);
					if !folder.is_empty() && partial_folders.insert(folder) {
						tracing::debug!(folder, "discovered partials folder");
					}
				}
				None => {
					tracing::warn!(path, src, "embedded file is outside the site root");
				}
			}

			format!("{{% partial file=\"{}\" /%}}", escape_attribute(src))
		})
		.into_owned()
}

/// Move free-text code fence titles into a `title` attribute. Only opening
/// fence lines are considered.
pub fn rewrite_code_fence_titles(text: &str) -> String {
	let mut fences = FenceTracker::default();
	let mut result = String::with_capacity(text.len());

	for line in text.split_inclusive('\n') {
		if fences.classify(line) == LineKind::Opening {
			result.push_str(&TITLED_FENCE_RE.replace(line, titled_fence));
		} else {
			result.push_str(line);
		}
	}

	result
}

fn titled_fence(caps: &Captures) -> String {
	let raw_title = &caps[4];
	let title = TITLE_ATTRIBUTE_RE.captures(raw_title).map_or(raw_title, |attr| {
		attr.get(1)
			.or_else(|| attr.get(2))
			.map_or(raw_title, |m| m.as_str())
	});

	format!(
		"{}{}{} {{% title=\"{}\" %}}",
		&caps[1],
		&caps[2],
		&caps[3],
		escape_attribute(title)
	)
}

/// Run every per-document rewrite over a markdown file living at `path`.
///
/// Markup rewrites come first, then frontmatter (only when the document has a
/// block), then links. Fenced code is never rewritten. Returns `None` when
/// the document is already migrated.
pub fn transform_document(
	text: &str,
	path: &str,
	ctx: &mut MigrationContext,
) -> DocshiftResult<Option<String>> {
	let mut result = rewrite_admonitions(text);
	result = map_outside_fences(&result, |prose| {
		rewrite_embeds(prose, path, &mut ctx.partial_folders)
	});
	result = rewrite_code_fence_titles(&result);

	let outcome = process_frontmatter(&result, path, ctx);
	if outcome.changed {
		result = splice_frontmatter(&result, &outcome, path)?;
	}

	result = map_outside_fences(&result, |prose| rewrite_links(prose, path, &ctx.registry));

	if result == text {
		Ok(None)
	} else {
		Ok(Some(result))
	}
}
