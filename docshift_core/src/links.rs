use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use crate::paths::is_external;
use crate::paths::parent_dir;
use crate::paths::relative_to;
use crate::paths::resolve_reference;
use crate::paths::slugify;
use crate::registry::RenameRegistry;

/// Suffix of the legacy descriptor files that generated API reference pages.
pub const DEFINITION_DESCRIPTOR_SUFFIX: &str = ".page.yaml";

/// Path segment that introduced a tag inside legacy reference-doc routes.
const TAG_MARKER: &str = "tag";

/// `[text](destination "title")` and `![alt](destination)`.
static INLINE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(!?\[[^\]\n]*\]\()([^)\s]+)((?:\s+(?:"[^"\n]*"|'[^'\n]*'))?\))"#).unwrap()
});

/// `[id]: destination` reference definitions.
static REFERENCE_DEFINITION_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?m)^([ \t]{0,3}\[[^\]\n]+\]:[ \t]*)(\S+)").unwrap());

/// Rewrite every internal link destination in `text`, a document located at
/// `path`, against the rename registry.
pub fn rewrite_links(text: &str, path: &str, registry: &RenameRegistry) -> String {
	let rewrite = |caps: &Captures| {
		let destination = &caps[2];
		let rewritten = rewrite_destination(destination, path, registry);
		if let Some(new) = &rewritten {
			tracing::debug!(path, from = destination, to = %new, "rewrote link");
		}

		format!(
			"{}{}{}",
			&caps[1],
			rewritten.as_deref().unwrap_or(destination),
			caps.get(3).map_or("", |m| m.as_str())
		)
	};

	let result = INLINE_LINK_RE.replace_all(text, rewrite);
	REFERENCE_DEFINITION_RE
		.replace_all(&result, rewrite)
		.into_owned()
}

/// Compute the new form of a single link destination, or `None` when it must
/// stay as written.
pub fn rewrite_destination(
	destination: &str,
	path: &str,
	registry: &RenameRegistry,
) -> Option<String> {
	if destination.starts_with('#') || is_external(destination) {
		return None;
	}

	let (link_path, anchor) = match destination.find('#') {
		Some(idx) => destination.split_at(idx),
		None => (destination, ""),
	};
	if link_path.is_empty() {
		return None;
	}

	let normalized = resolve_reference(path, link_path)?;

	if let Some(renamed) = registry.resolve(&normalized) {
		let relative = relative_to(parent_dir(path), renamed);
		return Some(format!("{relative}{anchor}"));
	}

	rewrite_reference_tag(link_path, &normalized, registry).map(|new| format!("{new}{anchor}"))
}

/// Legacy reference docs linked to tags as `<route>/tag/<Name>`. The new
/// router only knows the lower-cased tag name directly under the route.
///
/// Applies only when a relocated definition descriptor's route is a path
/// prefix of the link. Links that match no descriptor are left alone.
fn rewrite_reference_tag(
	link_path: &str,
	normalized: &str,
	registry: &RenameRegistry,
) -> Option<String> {
	let is_reference_route = registry.iter().any(|(original, _)| {
		original
			.strip_suffix(DEFINITION_DESCRIPTOR_SUFFIX)
			.map(slugify)
			.is_some_and(|route| is_path_prefix(&route, normalized))
	});
	if !is_reference_route {
		return None;
	}

	let segments: Vec<&str> = link_path.split('/').collect();
	let marker = segments
		.iter()
		.position(|segment| *segment == TAG_MARKER)
		.filter(|idx| segments.get(idx + 1).is_some_and(|tag| !tag.is_empty()))?;

	let mut rewritten: Vec<String> = Vec::with_capacity(segments.len() - 1);
	for (idx, segment) in segments.iter().enumerate() {
		if idx == marker {
			continue;
		}
		if idx == marker + 1 {
			rewritten.push(segment.to_lowercase());
		} else {
			rewritten.push((*segment).to_string());
		}
	}

	Some(rewritten.join("/"))
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
	if prefix.is_empty() {
		return false;
	}

	path.strip_prefix(prefix)
		.is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
