use std::sync::LazyLock;

use regex::Regex;
use serde_yaml_ng::Mapping;
use serde_yaml_ng::Value;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::context::MigrationContext;

/// A leading `---` line, an optional block, and a closing `---` line.
static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\A---[ \t]*\r?\n(?:([\s\S]*?)\r?\n)?---[ \t]*(?:\r?\n|\z)").unwrap()
});

/// Legacy documents mix tabs and spaces; tabs count as this many spaces.
const TAB_WIDTH: usize = 2;

const PERMISSION_KEY: &str = "permission";
const REDIRECT_FROM_KEY: &str = "redirectFrom";
const REDIRECTS_KEY: &str = "redirects";
const EXCLUDE_KEY: &str = "exclude";

/// Result of running the frontmatter rewrites over one document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterOutcome {
	/// The rewritten mapping, or `None` when the document has no (valid)
	/// frontmatter block.
	pub data: Option<Mapping>,
	/// Whether the mapping differs from what was parsed.
	pub changed: bool,
	/// Byte length of the original delimited block, closing line included.
	pub block_len: usize,
}

impl FrontmatterOutcome {
	fn absent() -> Self {
		Self {
			data: None,
			changed: false,
			block_len: 0,
		}
	}
}

/// Locate and parse the frontmatter block at the start of `text`.
///
/// Returns the parsed mapping and the byte length of the delimited block.
/// Absent or malformed frontmatter yields `None`.
pub fn parse_frontmatter(text: &str) -> Option<(Mapping, usize)> {
	let captures = FRONTMATTER_RE.captures(text)?;
	let block_len = captures.get(0)?.end();
	let raw = captures.get(1).map_or("", |m| m.as_str());
	let normalized = raw.replace('\t', &" ".repeat(TAB_WIDTH));

	if normalized.trim().is_empty() {
		return Some((Mapping::new(), block_len));
	}

	match serde_yaml_ng::from_str::<Value>(&normalized) {
		Ok(Value::Mapping(mapping)) => Some((mapping, block_len)),
		Ok(Value::Null) => Some((Mapping::new(), block_len)),
		Ok(_) => {
			tracing::warn!("frontmatter is not a mapping, leaving it untouched");
			None
		}
		Err(e) => {
			tracing::warn!("unparseable frontmatter, leaving it untouched: {e}");
			None
		}
	}
}

/// Apply the permission, redirect and exclude rewrites to the frontmatter of
/// a document whose migrated location is `final_path`.
///
/// Permissions and exclusions are recorded in `ctx` keyed by `final_path`.
/// `exclude` counts when it is set to anything but `false`, null or an empty
/// string, so `exclude: false` and `exclude: ''` leave the document indexed.
/// The key itself stays in the frontmatter.
pub fn process_frontmatter(
	text: &str,
	final_path: &str,
	ctx: &mut MigrationContext,
) -> FrontmatterOutcome {
	let Some((mut data, block_len)) = parse_frontmatter(text) else {
		return FrontmatterOutcome::absent();
	};
	let mut changed = false;

	if let Some(permission) = data.shift_remove(PERMISSION_KEY) {
		tracing::debug!(path = final_path, "moved permission into rbac config");
		ctx.rbac.insert(final_path.to_string(), permission);
		changed = true;
	}

	if let Some(redirects) = convert_redirects(&mut data) {
		let target = data
			.entry(Value::from(REDIRECTS_KEY))
			.or_insert_with(|| Value::Mapping(Mapping::new()));
		if let Value::Mapping(existing) = target {
			for (from, record) in redirects {
				existing.entry(from).or_insert(record);
			}
		} else {
			*target = Value::Mapping(redirects);
		}
		changed = true;
	}

	if data.get(EXCLUDE_KEY).is_some_and(is_truthy) {
		tracing::debug!(path = final_path, "document excluded from indexing");
		ctx.ignore.push(final_path);
	}

	FrontmatterOutcome {
		data: Some(data),
		changed,
		block_len,
	}
}

/// Re-assemble a document after [`process_frontmatter`].
///
/// The body after the original block is preserved byte-for-byte. An empty
/// mapping drops the block entirely.
pub fn splice_frontmatter(
	text: &str,
	outcome: &FrontmatterOutcome,
	path: &str,
) -> DocshiftResult<String> {
	let Some(data) = outcome.data.as_ref().filter(|_| outcome.changed) else {
		return Ok(text.to_string());
	};
	let body = &text[outcome.block_len..];

	if data.is_empty() {
		return Ok(body.to_string());
	}

	let yaml = serde_yaml_ng::to_string(data).map_err(|e| {
		DocshiftError::Yaml {
			path: path.to_string(),
			reason: e.to_string(),
		}
	})?;

	let mut result = String::with_capacity(yaml.len() + body.len() + 8);
	result.push_str("---\n");
	result.push_str(&yaml);
	if !yaml.ends_with('\n') {
		result.push('\n');
	}
	result.push_str("---\n");
	result.push_str(body);
	Ok(result)
}

/// Take `redirectFrom` out of `data` and build the keyed `redirects` form.
/// Values that are not a sequence or string stay where they are.
fn convert_redirects(data: &mut Mapping) -> Option<Mapping> {
	let urls: Vec<Value> = match data.get(REDIRECT_FROM_KEY)? {
		Value::Sequence(items) => items.clone(),
		Value::String(url) => vec![Value::String(url.clone())],
		_ => return None,
	};
	data.shift_remove(REDIRECT_FROM_KEY);

	let mut redirects = Mapping::new();
	for url in urls {
		if let Value::String(url) = url {
			redirects.insert(Value::String(url), Value::Mapping(Mapping::new()));
		}
	}
	Some(redirects)
}

/// `false`, null and the empty string are off; every other value is on.
fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null | Value::Bool(false) => false,
		Value::String(s) => !s.is_empty(),
		_ => true,
	}
}
