use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

/// Environment variable consulted for the API credential when `--api-key` is
/// not passed.
pub const API_KEY_ENV: &str = "DOCSHIFT_API_KEY";

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Migrate a legacy documentation portal to the new content schema.",
	long_about = "docshift moves a documentation site from the legacy portal schema to the new \
	              content schema in one run.\n\nMarkup is rewritten into Markdoc tags, API \
	              reference descriptors are replaced by their OpenAPI definitions, navigation \
	              trees are restructured and every internal link follows the files it points \
	              at.\n\nQuick start:\n  docshift migrate  Migrate the site in place\n  docshift \
	              check    Verify nothing is left to migrate"
)]
pub struct DocshiftCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the site root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Migrate the site in place.
	///
	/// Reads `siteConfig.yaml`, relocates API reference pages and MDX
	/// documents, rewrites every markdown document and navigation tree, then
	/// writes `redocly.yaml`. Anything that needs a human is collected into
	/// `MIGRATION_INSTRUCTIONS.md`.
	Migrate {
		/// API credential used to download remote OpenAPI definitions. Falls
		/// back to the `DOCSHIFT_API_KEY` environment variable. Without one,
		/// remote definitions are skipped and listed in the instructions.
		#[arg(long)]
		api_key: Option<String>,
	},
	/// Check that the site has nothing left to migrate.
	///
	/// Runs the document and navigation rewrites in memory and reports every
	/// file that would change. Exits with a non-zero status code when any
	/// would, which makes it suitable for CI after a migration.
	Check {
		/// Show a unified diff for each pending file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Text,
	Json,
}
