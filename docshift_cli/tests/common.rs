use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn docshift_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("docshift"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("DOCSHIFT_API_KEY");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Write `files` (root-relative path, content) under `root`, creating parent
/// directories as needed.
#[allow(dead_code)]
pub fn write_files(root: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
	for (path, content) in files {
		let target = root.join(path);
		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(target, content)?;
	}

	Ok(())
}

/// A small legacy site exercising every pass.
#[allow(dead_code)]
pub const LEGACY_SITE: &[(&str, &str)] = &[
	(
		"siteConfig.yaml",
		"oasDefinitions:\n  petstore: ./openapi/petstore.yaml\ntheme:\n  colors:\n    primary: \
		 '#227a88'\n",
	),
	("openapi/petstore.yaml", "openapi: 3.0.0\n"),
	(
		"api/petstore.page.yaml",
		"type: reference-docs\ndefinitionId: petstore\npermission: internal\n",
	),
	(
		"guides/intro.mdx",
		"---\nredirectFrom: /intro\n---\n:::attention Heads up\nRead this first.\n:::\n",
	),
	("guides/other.md", "See the [intro](intro.mdx#start).\n"),
	(
		"sidebars.yaml",
		"- label: Guides\n  pages:\n    - page: guides/intro.mdx\n    - page: \
		 guides/other.md\n- page: api/petstore.page.yaml\n  group: Petstore\n",
	),
];
