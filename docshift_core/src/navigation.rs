//! Rewriting of legacy `sidebars.yaml` navigation trees.
//!
//! Legacy trees group pages under `pages`, reference generated API reference
//! collections through `*.page.yaml` descriptors and use a `/*` wildcard to
//! pull in whole folders. The new schema uses `items`, points at the
//! relocated definition file and has a dedicated `directory` reference.
//!
//! Nodes are read into [`NavNode`] at the parse boundary. Fields the
//! transformer does not know about travel along untouched, in their original
//! position.

use std::path::Path;

use serde_yaml_ng::Mapping;
use serde_yaml_ng::Value;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::context::MigrationContext;
use crate::equality::structurally_equal;
use crate::links::DEFINITION_DESCRIPTOR_SUFFIX;
use crate::paths::file_name;
use crate::paths::is_external;
use crate::paths::join;
use crate::paths::parent_dir;
use crate::paths::relative_to;
use crate::paths::resolve_reference;
use crate::paths::slugify_segment;
use crate::registry::RenameRegistry;

const LEGACY_CHILDREN_KEY: &str = "pages";
const CHILDREN_KEY: &str = "items";
const PAGE_KEY: &str = "page";
const DIRECTORY_KEY: &str = "directory";
const LABEL_KEY: &str = "label";
const GROUP_KEY: &str = "group";
const WILDCARD_SUFFIX: &str = "/*";

/// One entry in a navigation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NavNode {
	/// A node with children under `pages` (legacy) or `items`.
	Group {
		children: Vec<NavNode>,
		fields: NodeFields,
	},
	/// A node pointing at a document.
	Page { page: String, fields: NodeFields },
	/// A node pointing at a folder.
	Directory {
		directory: String,
		fields: NodeFields,
	},
	/// Anything that is not a recognizable mapping node.
	Other(Value),
}

/// The fields of a mapping node other than its defining key, plus where the
/// defining key sat so it can be written back in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeFields {
	pub extra: Mapping,
	pub slot: usize,
}

impl NodeFields {
	fn split(mapping: Mapping, key: &str) -> (Option<Value>, Self) {
		let mut extra = Mapping::new();
		let mut defining = None;
		let mut slot = mapping.len();

		for (idx, (k, v)) in mapping.into_iter().enumerate() {
			if defining.is_none() && k.as_str() == Some(key) {
				defining = Some(v);
				slot = idx;
			} else {
				extra.insert(k, v);
			}
		}

		(defining, Self { extra, slot })
	}

	fn join(&self, key: &str, value: Value) -> Mapping {
		let mut mapping = Mapping::new();
		let mut pending = Some(value);

		for (idx, (k, v)) in self.extra.iter().enumerate() {
			if idx == self.slot {
				if let Some(value) = pending.take() {
					mapping.insert(Value::from(key), value);
				}
			}
			mapping.insert(k.clone(), v.clone());
		}
		if let Some(value) = pending {
			mapping.insert(Value::from(key), value);
		}

		mapping
	}

	fn get_str(&self, key: &str) -> Option<&str> {
		self.extra.get(key).and_then(Value::as_str)
	}
}

impl NavNode {
	/// Classify a loosely-typed YAML node.
	pub fn from_value(value: Value) -> Self {
		let Value::Mapping(mut mapping) = value else {
			return Self::Other(value);
		};

		let children_key = [CHILDREN_KEY, LEGACY_CHILDREN_KEY]
			.into_iter()
			.find(|key| matches!(mapping.get(*key), Some(Value::Sequence(_))));
		if let Some(key) = children_key {
			// Both keys present: the legacy one is dropped in favour of `items`.
			if key == CHILDREN_KEY {
				mapping.shift_remove(LEGACY_CHILDREN_KEY);
			}
			let (children, fields) = NodeFields::split(mapping, key);
			let children = match children {
				Some(Value::Sequence(items)) => items.into_iter().map(Self::from_value).collect(),
				_ => Vec::new(),
			};
			return Self::Group { children, fields };
		}

		if matches!(mapping.get(PAGE_KEY), Some(Value::String(_))) {
			let (page, fields) = NodeFields::split(mapping, PAGE_KEY);
			let page = page
				.as_ref()
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string();
			return Self::Page { page, fields };
		}

		if matches!(mapping.get(DIRECTORY_KEY), Some(Value::String(_))) {
			let (directory, fields) = NodeFields::split(mapping, DIRECTORY_KEY);
			let directory = directory
				.as_ref()
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string();
			return Self::Directory { directory, fields };
		}

		Self::Other(Value::Mapping(mapping))
	}

	/// Serialize back into the new schema.
	pub fn into_value(self) -> Value {
		match self {
			Self::Group { children, fields } => {
				let items = children.into_iter().map(Self::into_value).collect();
				Value::Mapping(fields.join(CHILDREN_KEY, Value::Sequence(items)))
			}
			Self::Page { page, fields } => Value::Mapping(fields.join(PAGE_KEY, Value::String(page))),
			Self::Directory { directory, fields } => {
				Value::Mapping(fields.join(DIRECTORY_KEY, Value::String(directory)))
			}
			Self::Other(value) => value,
		}
	}
}

/// One navigation file to be written after transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeOutput {
	/// Root-relative path of the output file.
	pub path: String,
	pub value: Value,
	/// `false` when the output is structurally identical to what is already
	/// on disk at `path`.
	pub changed: bool,
}

impl TreeOutput {
	pub fn to_yaml(&self) -> DocshiftResult<String> {
		serde_yaml_ng::to_string(&self.value).map_err(|e| {
			DocshiftError::Yaml {
				path: self.path.clone(),
				reason: e.to_string(),
			}
		})
	}
}

/// Transform a parsed navigation file located at `tree_path`.
///
/// A top-level sequence is a single tree and produces one output at the same
/// path. A top-level mapping holds several named trees and is split into one
/// output per name: the first keeps the file name, later ones get a
/// slugified `<name>-` prefix. When any of those later files already exists
/// under `root`, nothing is produced and the instructions log says why.
pub fn transform_tree_file(
	root: &Path,
	original: &Value,
	tree_path: &str,
	ctx: &mut MigrationContext,
) -> DocshiftResult<Vec<TreeOutput>> {
	match original {
		Value::Sequence(items) => {
			let value = transform_tree(items, tree_path, &ctx.registry)?;
			let changed = !structurally_equal(&value, original);
			Ok(vec![TreeOutput {
				path: tree_path.to_string(),
				value,
				changed,
			}])
		}
		Value::Mapping(trees) => split_named_trees(root, trees, tree_path, ctx),
		_ => {
			tracing::warn!(path = tree_path, "navigation file is neither a list nor a mapping");
			ctx.instructions.push(format!(
				"## Navigation `{tree_path}`\n\nThe file does not contain a navigation list and was \
				 left unchanged. Recreate it manually.\n"
			));
			Ok(Vec::new())
		}
	}
}

fn split_named_trees(
	root: &Path,
	trees: &Mapping,
	tree_path: &str,
	ctx: &mut MigrationContext,
) -> DocshiftResult<Vec<TreeOutput>> {
	let all_sequences = trees.values().all(|value| matches!(value, Value::Sequence(_)));
	if trees.is_empty() || !all_sequences {
		tracing::warn!(path = tree_path, "unrecognized navigation mapping left unchanged");
		ctx.instructions.push(format!(
			"## Navigation `{tree_path}`\n\nThe file maps names to something other than \
			 navigation lists and was left unchanged. Recreate it manually.\n"
		));
		return Ok(Vec::new());
	}

	let dir = parent_dir(tree_path);
	let base_name = file_name(tree_path);
	let targets: Vec<String> = trees
		.keys()
		.enumerate()
		.map(|(idx, name)| {
			if idx == 0 {
				return tree_path.to_string();
			}
			let name = name.as_str().map_or_else(|| format!("tree-{idx}"), slugify_segment);
			join(dir, &format!("{name}-{base_name}")).unwrap_or_else(|| format!("{name}-{base_name}"))
		})
		.collect();

	// Two names can slugify to the same file.
	let taken: Vec<&String> = targets
		.iter()
		.enumerate()
		.skip(1)
		.filter(|(idx, target)| root.join(target).exists() || targets[..*idx].contains(*target))
		.map(|(_, target)| target)
		.collect();
	if !taken.is_empty() {
		tracing::warn!(path = tree_path, "split targets already exist, tree file left unchanged");
		let listed = taken
			.iter()
			.map(|target| format!("- `{target}`"))
			.collect::<Vec<_>>()
			.join("\n");
		ctx.instructions.push(format!(
			"## Navigation `{tree_path}`\n\nThe file declares {} navigation trees, but these \
			 files it would be split into already exist or collide:\n\n{listed}\n\nThe file was left \
			 unchanged. Split it by hand.\n",
			trees.len()
		));
		return Ok(Vec::new());
	}

	let mut outputs = Vec::with_capacity(trees.len());
	for (output_path, tree) in targets.into_iter().zip(trees.values()) {
		let Value::Sequence(items) = tree else {
			continue;
		};
		let value = transform_tree(items, &output_path, &ctx.registry)?;
		outputs.push(TreeOutput {
			path: output_path,
			value,
			changed: true,
		});
	}

	let written = outputs
		.iter()
		.map(|output| format!("- `{}`", output.path))
		.collect::<Vec<_>>()
		.join("\n");
	ctx.instructions.push(format!(
		"## Navigation `{tree_path}` was split\n\nThe file declared {} navigation trees. Each one \
		 now lives in its own file:\n\n{written}\n\nOnly the first is picked up automatically; \
		 reference the others from the folders they describe.\n",
		outputs.len()
	));

	Ok(outputs)
}

/// Transform one navigation list whose file lives at `tree_path`.
pub fn transform_tree(
	items: &[Value],
	tree_path: &str,
	registry: &RenameRegistry,
) -> DocshiftResult<Value> {
	let transformed = items
		.iter()
		.cloned()
		.map(|item| transform_node(NavNode::from_value(item), tree_path, registry))
		.map(|node| node.map(NavNode::into_value))
		.collect::<DocshiftResult<Vec<_>>>()?;

	Ok(Value::Sequence(transformed))
}

fn transform_node(
	node: NavNode,
	tree_path: &str,
	registry: &RenameRegistry,
) -> DocshiftResult<NavNode> {
	match node {
		NavNode::Group {
			children,
			mut fields,
		} => {
			let children = children
				.into_iter()
				.map(|child| transform_node(child, tree_path, registry))
				.collect::<DocshiftResult<Vec<_>>>()?;

			// A group may carry its own landing page.
			if let Some(page) = fields.get_str(PAGE_KEY).map(ToString::to_string) {
				if let Some(renamed) = resolve_plain_page(&page, tree_path, registry) {
					fields
						.extra
						.insert(Value::from(PAGE_KEY), Value::String(renamed));
				}
			}

			Ok(NavNode::Group { children, fields })
		}
		NavNode::Page { page, fields } => transform_page(page, fields, tree_path, registry),
		other => Ok(other),
	}
}

fn transform_page(
	page: String,
	mut fields: NodeFields,
	tree_path: &str,
	registry: &RenameRegistry,
) -> DocshiftResult<NavNode> {
	if is_external(&page) {
		return Ok(NavNode::Page { page, fields });
	}

	if let Some(base) = page.strip_suffix(WILDCARD_SUFFIX) {
		if base.ends_with(DEFINITION_DESCRIPTOR_SUFFIX) {
			let renamed = resolve_collection(base, tree_path, registry)?;
			return Ok(NavNode::Page {
				page: renamed,
				fields,
			});
		}

		return Ok(NavNode::Directory {
			directory: base.to_string(),
			fields,
		});
	}

	if page.ends_with(DEFINITION_DESCRIPTOR_SUFFIX) {
		let renamed = resolve_collection(&page, tree_path, registry)?;
		let label = fields
			.extra
			.get(LABEL_KEY)
			.cloned()
			.or_else(|| fields.extra.shift_remove(GROUP_KEY));
		if let Some(label) = label {
			fields.extra.shift_remove(GROUP_KEY);
			fields.extra.insert(Value::from(LABEL_KEY), label);
		}

		return Ok(NavNode::Page {
			page: renamed,
			fields,
		});
	}

	let page = resolve_plain_page(&page, tree_path, registry).unwrap_or(page);
	Ok(NavNode::Page { page, fields })
}

/// A structured page collection must have been relocated by an earlier
/// pass; its absence means the phases disagree on the file layout.
fn resolve_collection(
	reference: &str,
	tree_path: &str,
	registry: &RenameRegistry,
) -> DocshiftResult<String> {
	resolve_plain_page(reference, tree_path, registry).ok_or_else(|| {
		DocshiftError::MissingRename {
			page: reference.to_string(),
			tree: tree_path.to_string(),
		}
	})
}

/// Registry resolution of a page reference, expressed relative to the
/// navigation file's own directory.
fn resolve_plain_page(
	reference: &str,
	tree_path: &str,
	registry: &RenameRegistry,
) -> Option<String> {
	let normalized = resolve_reference(tree_path, reference)?;
	let renamed = registry.resolve(&normalized)?;
	Some(relative_to(parent_dir(tree_path), renamed))
}
