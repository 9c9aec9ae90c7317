use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DocshiftError {
	#[error(transparent)]
	#[diagnostic(code(docshift::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse yaml in `{path}`: {reason}")]
	#[diagnostic(code(docshift::yaml))]
	Yaml { path: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(docshift::config_parse),
		help("check that docshift.toml is valid TOML with an optional [exclude] section")
	)]
	ConfigParse(String),

	#[error("legacy site config not found: `{0}`")]
	#[diagnostic(
		code(docshift::missing_site_config),
		help("run docshift from the root of the legacy portal or pass `--path`")
	)]
	MissingSiteConfig(String),

	#[error("`{original}` was relocated twice: first to `{first}`, then to `{second}`")]
	#[diagnostic(
		code(docshift::registry_collision),
		help(
			"two migration passes tried to move the same file; the content tree is inconsistent"
		)
	)]
	RegistryCollision {
		original: String,
		first: String,
		second: String,
	},

	#[error("`{page}` in navigation tree `{tree}` has no migrated location")]
	#[diagnostic(
		code(docshift::missing_rename),
		help(
			"the page collection was not relocated by the definitions pass; check its \
			 `definitionId` against `oasDefinitions` in siteConfig.yaml"
		)
	)]
	MissingRename { page: String, tree: String },

	#[error("invalid path pattern `{pattern}`: {reason}")]
	#[diagnostic(code(docshift::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("failed to fetch remote definition `{id}`: {reason}")]
	#[diagnostic(code(docshift::fetch))]
	Fetch { id: String, reason: String },
}

pub type DocshiftResult<T> = Result<T, DocshiftError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
