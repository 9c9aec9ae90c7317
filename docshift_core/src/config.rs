use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_yaml_ng::Mapping;
use serde_yaml_ng::Value;

use crate::DocshiftError;
use crate::DocshiftResult;
use crate::context::MigrationContext;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"docshift.toml",
	".docshift.toml",
	".config/docshift.toml",
];

pub const DEFAULT_SITE_CONFIG: &str = "siteConfig.yaml";
pub const DEFAULT_OUTPUT_CONFIG: &str = "redocly.yaml";
pub const DEFAULT_INSTRUCTIONS_FILE: &str = "MIGRATION_INSTRUCTIONS.md";

/// Configuration loaded from a `docshift.toml` file.
///
/// ```toml
/// site_config = "siteConfig.yaml"
/// output_config = "redocly.yaml"
/// instructions_file = "MIGRATION_INSTRUCTIONS.md"
///
/// [exclude]
/// patterns = ["drafts/", "*.generated.md"]
/// ```
#[derive(Debug, Deserialize)]
pub struct DocshiftConfig {
	/// Legacy site configuration file, relative to the project root.
	#[serde(default = "default_site_config")]
	pub site_config: PathBuf,
	/// Where the assembled site configuration is written.
	#[serde(default = "default_output_config")]
	pub output_config: PathBuf,
	/// Where follow-up instructions are written when any were collected.
	#[serde(default = "default_instructions_file")]
	pub instructions_file: PathBuf,
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
}

impl Default for DocshiftConfig {
	fn default() -> Self {
		Self {
			site_config: default_site_config(),
			output_config: default_output_config(),
			instructions_file: default_instructions_file(),
			exclude: ExcludeConfig::default(),
		}
	}
}

/// Configuration for excluding files and directories from every listing.
///
/// Patterns follow gitignore syntax and are relative to the project root.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Examples: `"build/"`, `"*.generated.md"`, `"!important.md"`.
	#[serde(default)]
	pub patterns: Vec<String>,
}

fn default_site_config() -> PathBuf {
	PathBuf::from(DEFAULT_SITE_CONFIG)
}

fn default_output_config() -> PathBuf {
	PathBuf::from(DEFAULT_OUTPUT_CONFIG)
}

fn default_instructions_file() -> PathBuf {
	PathBuf::from(DEFAULT_INSTRUCTIONS_FILE)
}

impl DocshiftConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> DocshiftResult<Option<DocshiftConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: DocshiftConfig =
			toml::from_str(&content).map_err(|e| DocshiftError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Load the discovered config or fall back to defaults.
	pub fn load_or_default(root: &Path) -> DocshiftResult<DocshiftConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}
}

/// Sections of the legacy site configuration that have no automatic
/// migration and are handed to a human instead.
const DEFERRED_SECTIONS: [(&str, &str); 4] = [
	(
		"theme",
		"Theme settings from `siteConfig.yaml` (`theme`) must be re-created in the new theme \
		 configuration.",
	),
	(
		"rbac",
		"Access-control settings from `siteConfig.yaml` (`rbac`) must be translated into the \
		 `rbac` section of the new configuration.",
	),
	(
		"seo",
		"SEO settings from `siteConfig.yaml` (`seo`) must be moved into the new `seo` \
		 configuration.",
	),
	(
		"nav",
		"Top navigation from `siteConfig.yaml` (`nav`) must be re-created as the new navbar \
		 configuration.",
	),
];

/// The legacy portal's `siteConfig.yaml`.
#[derive(Debug, Clone, Default)]
pub struct LegacySiteConfig {
	/// Definition identifier to local path or URL.
	pub oas_definitions: BTreeMap<String, String>,
	/// Top-level keys present in the file, in file order.
	pub keys: Vec<String>,
}

impl LegacySiteConfig {
	/// Load the legacy site config. Its absence aborts the run.
	pub fn load(root: &Path, relative: &Path) -> DocshiftResult<Self> {
		let path = root.join(relative);
		if !path.is_file() {
			return Err(DocshiftError::MissingSiteConfig(
				relative.display().to_string(),
			));
		}

		let content = std::fs::read_to_string(&path)?;
		Self::parse(&content, &relative.display().to_string())
	}

	/// Parse the YAML text of a legacy site config.
	pub fn parse(content: &str, display_path: &str) -> DocshiftResult<Self> {
		let value: Value = serde_yaml_ng::from_str(content).map_err(|e| {
			DocshiftError::Yaml {
				path: display_path.to_string(),
				reason: e.to_string(),
			}
		})?;
		let mapping = match value {
			Value::Mapping(mapping) => mapping,
			Value::Null => Mapping::new(),
			_ => {
				return Err(DocshiftError::Yaml {
					path: display_path.to_string(),
					reason: "expected a mapping at the top level".to_string(),
				});
			}
		};

		let keys = mapping
			.keys()
			.filter_map(Value::as_str)
			.map(ToString::to_string)
			.collect();

		let mut oas_definitions = BTreeMap::new();
		if let Some(Value::Mapping(definitions)) = mapping.get("oasDefinitions") {
			for (id, location) in definitions {
				let (Some(id), Some(location)) = (id.as_str(), definition_location(location))
				else {
					tracing::warn!("skipping unrecognized oasDefinitions entry");
					continue;
				};
				oas_definitions.insert(id.to_string(), location);
			}
		}

		Ok(Self {
			oas_definitions,
			keys,
		})
	}

	/// Append an instruction for every legacy section that needs a human.
	pub fn defer_unmigratable(&self, ctx: &mut MigrationContext) {
		for (key, instruction) in DEFERRED_SECTIONS {
			if self.keys.iter().any(|k| k == key) {
				ctx.instructions.push(format!("## `{key}`\n\n{instruction}\n"));
			}
		}
	}
}

/// A definition entry is either a bare path/URL or `{ path: ... }` /
/// `{ url: ... }`.
fn definition_location(value: &Value) -> Option<String> {
	match value {
		Value::String(location) => Some(location.clone()),
		Value::Mapping(entry) => {
			entry
				.get("url")
				.or_else(|| entry.get("path"))
				.and_then(Value::as_str)
				.map(ToString::to_string)
		}
		_ => None,
	}
}

/// Assemble the generated site configuration from what the run collected.
///
/// ```yaml
/// ignore:
///   - '**/_*'
/// rbac:
///   content:
///     guides/admin.md: admin
/// markdown:
///   partialsFolders:
///     - _partials
/// ```
pub fn assemble_site_config(ctx: &MigrationContext) -> Mapping {
	let mut config = Mapping::new();

	config.insert(
		Value::from("ignore"),
		Value::Sequence(ctx.ignore.iter().cloned().map(Value::String).collect()),
	);

	if !ctx.rbac.is_empty() {
		let mut content = Mapping::new();
		for (path, permission) in &ctx.rbac {
			content.insert(Value::String(path.clone()), permission.clone());
		}
		let mut rbac = Mapping::new();
		rbac.insert(Value::from("content"), Value::Mapping(content));
		config.insert(Value::from("rbac"), Value::Mapping(rbac));
	}

	if !ctx.partial_folders.is_empty() {
		let mut markdown = Mapping::new();
		markdown.insert(
			Value::from("partialsFolders"),
			Value::Sequence(
				ctx.partial_folders
					.iter()
					.cloned()
					.map(Value::String)
					.collect(),
			),
		);
		config.insert(Value::from("markdown"), Value::Mapping(markdown));
	}

	config
}

/// Read a previously generated site configuration, if one exists.
///
/// A file that is not a YAML mapping is an error rather than something to
/// overwrite.
pub fn load_site_config(path: &Path, display_path: &str) -> DocshiftResult<Option<Mapping>> {
	if !path.is_file() {
		return Ok(None);
	}

	let content = std::fs::read_to_string(path)?;
	let value: Value = serde_yaml_ng::from_str(&content).map_err(|e| {
		DocshiftError::Yaml {
			path: display_path.to_string(),
			reason: e.to_string(),
		}
	})?;

	match value {
		Value::Mapping(mapping) => Ok(Some(mapping)),
		Value::Null => Ok(None),
		_ => {
			Err(DocshiftError::Yaml {
				path: display_path.to_string(),
				reason: "expected a mapping at the top level".to_string(),
			})
		}
	}
}

/// Merge a freshly assembled site configuration into `existing`.
///
/// Mappings merge key by key, sequences are unioned in order, and other
/// values from this run replace the old ones. Keys this run does not produce
/// are kept as they are, so permissions and partial folders recorded by an
/// earlier run survive a rerun over already migrated content.
pub fn merge_site_config(mut existing: Mapping, generated: Mapping) -> Mapping {
	for (key, value) in generated {
		match existing.get_mut(&key) {
			Some(current) => merge_value(current, value),
			None => {
				existing.insert(key, value);
			}
		}
	}

	existing
}

fn merge_value(current: &mut Value, generated: Value) {
	match (current, generated) {
		(Value::Mapping(current), Value::Mapping(generated)) => {
			for (key, value) in generated {
				match current.get_mut(&key) {
					Some(existing) => merge_value(existing, value),
					None => {
						current.insert(key, value);
					}
				}
			}
		}
		(Value::Sequence(current), Value::Sequence(generated)) => {
			for item in generated {
				if !current.contains(&item) {
					current.push(item);
				}
			}
		}
		(current, generated) => *current = generated,
	}
}
