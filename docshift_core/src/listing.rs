use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::GlobBuilder;
use globset::GlobMatcher;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::paths::relative_key;

/// Directory names that never hold site content.
const SKIPPED_DIRECTORIES: [&str; 6] = ["node_modules", "dist", "build", "public", "target", ".cache"];

/// Lists site files under a root, honoring `.gitignore` and the configured
/// exclude patterns.
///
/// Every pass re-lists the tree so files relocated by an earlier pass are seen
/// at their new location.
#[derive(Debug)]
pub struct FileLister {
	root: PathBuf,
	gitignore: Gitignore,
	exclude: Gitignore,
}

impl FileLister {
	pub fn new(root: &Path, exclude_patterns: &[String]) -> DocshiftResult<Self> {
		Ok(Self {
			root: root.to_path_buf(),
			gitignore: build_gitignore(root),
			exclude: build_exclude_matcher(root, exclude_patterns)?,
		})
	}

	/// Every root-relative path matching `pattern`, sorted.
	///
	/// `*` does not cross `/`; use `**/` to match at any depth.
	pub fn list(&self, pattern: &str) -> DocshiftResult<Vec<String>> {
		let matcher = build_matcher(pattern)?;
		let mut files = Vec::new();
		let mut visited_dirs = HashSet::new();

		self.walk_dir(&self.root, &matcher, &mut files, &mut visited_dirs)?;
		files.sort();

		tracing::debug!(pattern, count = files.len(), "listed files");
		Ok(files)
	}

	fn walk_dir(
		&self,
		dir: &Path,
		matcher: &GlobMatcher,
		files: &mut Vec<String>,
		visited_dirs: &mut HashSet<PathBuf>,
	) -> DocshiftResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		// Symlinked directories can loop back on an ancestor.
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited_dirs.insert(canonical) {
			tracing::warn!(path = %dir.display(), "skipping symlink cycle");
			return Ok(());
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if path
				.file_name()
				.and_then(|n| n.to_str())
				.is_some_and(is_ignored_name)
			{
				continue;
			}

			let is_dir = path.is_dir();
			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				self.walk_dir(&path, matcher, files, visited_dirs)?;
				continue;
			}

			let key = relative_key(&self.root, &path);
			if matcher.is_match(&key) {
				files.push(key);
			}
		}

		Ok(())
	}
}

fn is_ignored_name(name: &str) -> bool {
	name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name)
}

fn build_matcher(pattern: &str) -> DocshiftResult<GlobMatcher> {
	GlobBuilder::new(pattern)
		.literal_separator(true)
		.build()
		.map(|glob| glob.compile_matcher())
		.map_err(|e| {
			DocshiftError::InvalidPattern {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			}
		})
}

/// Build a `Gitignore` matcher from the `[exclude]` patterns of
/// `docshift.toml`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> DocshiftResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			DocshiftError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		DocshiftError::ConfigParse(format!("failed to build exclude rules: {e}"))
	})
}

/// Build a `Gitignore` matcher from the root `.gitignore`, if any.
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		if let Some(e) = builder.add(gitignore_path) {
			tracing::warn!("ignoring unreadable .gitignore: {e}");
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Normalize CRLF line endings to LF.
pub fn normalize_line_endings(content: &str) -> String {
	if content.contains('\r') {
		content.replace("\r\n", "\n").replace('\r', "\n")
	} else {
		content.to_string()
	}
}
