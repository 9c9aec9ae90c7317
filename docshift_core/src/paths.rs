//! Path helpers shared by the registry, link rewriter and navigation
//! transformer.
//!
//! Every path handled by the engine is a `/`-separated string relative to the
//! site root. Filesystem paths are converted at the edges with
//! [`relative_key`].

use std::path::Path;

/// Normalize a root-relative path: backslashes become `/`, empty and `.`
/// segments are dropped and `..` segments pop their parent.
///
/// Returns `None` when the path climbs above the root.
pub fn normalize_path(path: &str) -> Option<String> {
	let path = path.replace('\\', "/");
	let mut segments: Vec<&str> = Vec::new();

	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop()?;
			}
			other => segments.push(other),
		}
	}

	Some(segments.join("/"))
}

/// The directory part of a root-relative path (`""` for files at the root).
pub fn parent_dir(path: &str) -> &str {
	path.rfind('/').map_or("", |idx| &path[..idx])
}

/// The final segment of a root-relative path.
pub fn file_name(path: &str) -> &str {
	path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Join a root-relative directory with a relative path and normalize.
pub fn join(dir: &str, path: &str) -> Option<String> {
	if dir.is_empty() {
		normalize_path(path)
	} else {
		normalize_path(&format!("{dir}/{path}"))
	}
}

/// Resolve a reference found in a file at `from_file` to a root-relative path.
///
/// A leading `/` marks a root-relative reference; anything else is relative
/// to the directory containing `from_file`.
pub fn resolve_reference(from_file: &str, reference: &str) -> Option<String> {
	match reference.strip_prefix('/') {
		Some(rooted) => normalize_path(rooted),
		None => join(parent_dir(from_file), reference),
	}
}

/// Express the root-relative `target` relative to the root-relative directory
/// `from_dir`.
pub fn relative_to(from_dir: &str, target: &str) -> String {
	let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
	let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

	let common = from
		.iter()
		.zip(to.iter())
		.take_while(|(a, b)| a == b)
		.count();

	let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
	parts.extend(std::iter::repeat_n("..", from.len() - common));
	parts.extend(&to[common..]);

	if parts.is_empty() {
		".".to_string()
	} else {
		parts.join("/")
	}
}

/// Lower-case a single segment and collapse every run of non-alphanumeric
/// characters into one hyphen, trimming hyphens at both ends.
pub fn slugify_segment(segment: &str) -> String {
	let mut slug = String::with_capacity(segment.len());
	let mut pending_hyphen = false;

	for ch in segment.chars().flat_map(char::to_lowercase) {
		if ch.is_ascii_alphanumeric() {
			if pending_hyphen && !slug.is_empty() {
				slug.push('-');
			}
			pending_hyphen = false;
			slug.push(ch);
		} else {
			pending_hyphen = true;
		}
	}

	slug
}

/// Slugify every segment of a path and rejoin with `/`. Segments that slugify
/// to nothing are dropped.
pub fn slugify(path: &str) -> String {
	path.split('/')
		.map(slugify_segment)
		.filter(|segment| !segment.is_empty())
		.collect::<Vec<_>>()
		.join("/")
}

/// Convert an on-disk path under `root` into the engine's root-relative key.
pub fn relative_key(root: &Path, file: &Path) -> String {
	file.strip_prefix(root)
		.unwrap_or(file)
		.to_string_lossy()
		.replace('\\', "/")
}

/// Whether a link destination points outside the site (URI scheme,
/// protocol-relative URL or mail link).
pub fn is_external(destination: &str) -> bool {
	if destination.starts_with("//") {
		return true;
	}

	let Some(colon) = destination.find(':') else {
		return false;
	};
	let scheme = &destination[..colon];
	!scheme.is_empty()
		&& scheme
			.chars()
			.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
		&& scheme.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic())
}
