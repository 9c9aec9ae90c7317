use std::path::Path;

use rstest::rstest;
use serde_yaml_ng::Value;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::*;
use crate::paths::normalize_path;
use crate::paths::relative_to;
use crate::paths::slugify;

fn yaml(text: &str) -> Value {
	serde_yaml_ng::from_str(text).unwrap_or_else(|e| panic!("invalid yaml fixture: {e}"))
}

fn write_files(root: &Path, files: &[(&str, &str)]) -> DocshiftResult<()> {
	for (path, content) in files {
		let target = root.join(path);
		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(target, content)?;
	}

	Ok(())
}

fn registry_with(entries: &[(&str, &str)]) -> DocshiftResult<RenameRegistry> {
	let mut registry = RenameRegistry::new();
	for (original, new) in entries {
		registry.record(original, new)?;
	}

	Ok(registry)
}

struct CountingPrompt {
	answer: Option<String>,
	calls: usize,
}

impl CredentialPrompt for CountingPrompt {
	fn prompt(&mut self) -> Option<String> {
		self.calls += 1;
		self.answer.clone()
	}
}

struct StubFetcher {
	requested: Vec<String>,
	/// Suggested file name for every download, `<id>.yaml` when unset.
	file_name: Option<&'static str>,
}

impl DefinitionFetcher for StubFetcher {
	fn fetch(
		&mut self,
		id: &str,
		_location: &str,
		credential: &str,
	) -> DocshiftResult<FetchedDefinition> {
		assert_eq!(credential, "secret");
		self.requested.push(id.to_string());
		Ok(FetchedDefinition {
			content: Some(format!("openapi: 3.1.0\ninfo:\n  title: {id}\n")),
			reconnect_note: format!("Reconnect `{id}` to its remote source."),
			file_name: self
				.file_name
				.map_or_else(|| format!("{id}.yaml"), ToString::to_string),
		})
	}
}

#[rstest]
#[case::plain("docs/a.md", Some("docs/a.md"))]
#[case::dot_segments("./docs/./a.md", Some("docs/a.md"))]
#[case::parent("docs/guides/../a.md", Some("docs/a.md"))]
#[case::backslashes("docs\\guides\\a.md", Some("docs/guides/a.md"))]
#[case::escapes_root("../a.md", None)]
fn normalize_paths(#[case] input: &str, #[case] expected: Option<&str>) {
	assert_eq!(normalize_path(input).as_deref(), expected);
}

#[rstest]
#[case::sibling("a", "a/c.md", "c.md")]
#[case::up_and_over("a", "d/c.md", "../d/c.md")]
#[case::from_root("", "d/c.md", "d/c.md")]
#[case::deeper("a/b", "a/c/d.md", "../c/d.md")]
#[case::same_dir("a", "a", ".")]
fn relative_paths(#[case] from_dir: &str, #[case] target: &str, #[case] expected: &str) {
	assert_eq!(relative_to(from_dir, target), expected);
}

#[test]
fn slugify_paths() {
	assert_eq!(slugify("API Reference/Pet Store"), "api-reference/pet-store");
	assert_eq!(slugify("./docs//v2.0/"), "docs/v2-0");
}

#[test]
fn registry_normalizes_keys() -> DocshiftResult<()> {
	let registry = registry_with(&[("./docs\\intro.mdx", "docs/intro.md")])?;

	assert_eq!(registry.resolve("docs/intro.mdx"), Some("docs/intro.md"));
	assert_eq!(registry.resolve("docs/guides/../intro.mdx"), Some("docs/intro.md"));
	assert_eq!(registry.resolve("docs/missing.md"), None);
	assert_eq!(registry.len(), 1);

	Ok(())
}

#[test]
fn registry_rejects_second_relocation() -> DocshiftResult<()> {
	let mut registry = registry_with(&[("a.md", "b.md")])?;
	let result = registry.record("./a.md", "c.md");

	assert!(matches!(
		result,
		Err(DocshiftError::RegistryCollision { ref original, ref first, ref second })
			if original == "a.md" && first == "b.md" && second == "c.md"
	));
	assert_eq!(registry.resolve("a.md"), Some("b.md"));

	Ok(())
}

#[rstest]
#[case::nan(".nan", ".NaN", true)]
#[case::integers("1", "1", true)]
#[case::int_and_float("1", "1.0", true)]
#[case::different_numbers("1", "2", false)]
#[case::mapping_order("{a: 1, b: [x, y]}", "{b: [x, y], a: 1}", true)]
#[case::sequence_order("[x, y]", "[y, x]", false)]
#[case::missing_key("{a: 1}", "{a: 1, b: 2}", false)]
#[case::nested_nan("{a: [.nan]}", "{a: [.nan]}", true)]
#[case::null_vs_string("~", "''", false)]
fn structural_equality(#[case] left: &str, #[case] right: &str, #[case] expected: bool) {
	assert_eq!(structurally_equal(&yaml(left), &yaml(right)), expected);
	assert_eq!(structurally_equal(&yaml(right), &yaml(left)), expected);
}

#[test]
fn frontmatter_moves_permission_and_redirects() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let text = "---\npermission: admin\nredirectFrom:\n  - /old/path\n  - /older\ntitle: Guide\n---\n# Body\n";

	let result = transform_document(text, "guides/a.md", &mut ctx)?;

	assert_eq!(
		result.as_deref(),
		Some(
			"---\ntitle: Guide\nredirects:\n  /old/path: {}\n  /older: {}\n---\n# Body\n"
		)
	);
	assert_eq!(ctx.rbac.get("guides/a.md"), Some(&Value::from("admin")));

	Ok(())
}

#[test]
fn frontmatter_collapses_when_emptied() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let result = transform_document("---\npermission: admin\n---\nBody\n", "a.md", &mut ctx)?;

	assert_eq!(result.as_deref(), Some("Body\n"));

	Ok(())
}

#[test]
fn frontmatter_tolerates_tabs() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let text = "---\ntitle: X\nmeta:\n\tkey: value\npermission: p\n---\nB\n";

	let result = transform_document(text, "a.md", &mut ctx)?;

	assert_eq!(
		result.as_deref(),
		Some("---\ntitle: X\nmeta:\n  key: value\n---\nB\n")
	);

	Ok(())
}

#[test]
fn frontmatter_exclude_adds_ignore_entry() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let result = transform_document("---\nexclude: true\n---\nB\n", "drafts/a.md", &mut ctx)?;

	assert_eq!(result, None);
	assert_eq!(
		ctx.ignore.to_vec(),
		vec![DEFAULT_IGNORE_PATTERN.to_string(), "drafts/a.md".to_string()]
	);

	Ok(())
}

#[rstest]
#[case::true_flag("true", true)]
#[case::non_empty_string("'yes'", true)]
#[case::false_flag("false", false)]
#[case::empty_string("''", false)]
#[case::null("~", false)]
fn frontmatter_exclude_values(#[case] value: &str, #[case] excluded: bool) -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let text = format!("---\nexclude: {value}\n---\nB\n");

	let result = transform_document(&text, "a.md", &mut ctx)?;

	assert_eq!(result, None);
	assert_eq!(ctx.ignore.contains(&"a.md".to_string()), excluded);

	Ok(())
}

#[test]
#[traced_test]
fn malformed_frontmatter_is_left_untouched() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	let text = "---\ntitle: [unclosed\npermission: admin\n---\nBody\n";

	let result = transform_document(text, "a.md", &mut ctx)?;

	assert_eq!(result, None);
	assert!(ctx.rbac.is_empty());
	assert!(logs_contain("unparseable frontmatter"));

	Ok(())
}

#[test]
fn admonition_with_title() {
	let output = rewrite_admonitions(":::warning Be careful\nDo not do this.\n:::\n\nAfter.\n");

	insta::assert_snapshot!(output, @r#"
	{% admonition type="warning" name="Be careful" %}
	Do not do this.
	{% /admonition %}

	After.
	"#);
}

#[rstest]
#[case::attention_renamed(":::attention\nBody\n:::", "{% admonition type=\"info\" %}\nBody\n{% /admonition %}")]
#[case::uppercase_type(":::NOTE\nBody\n:::\n", "{% admonition type=\"note\" %}\nBody\n{% /admonition %}\n")]
#[case::quoted_title(":::tip Use \"this\"\nBody\n:::\n", "{% admonition type=\"tip\" name=\"Use \\\"this\\\"\" %}\nBody\n{% /admonition %}\n")]
#[case::unterminated(":::info\nBody", "{% admonition type=\"info\" %}\nBody\n{% /admonition %}")]
#[case::already_migrated("{% admonition type=\"info\" %}\nBody\n{% /admonition %}\n", "{% admonition type=\"info\" %}\nBody\n{% /admonition %}\n")]
#[case::nested(":::note\nA\n:::tip\nB\n:::\n:::\n", "{% admonition type=\"note\" %}\nA\n{% admonition type=\"tip\" %}\nB\n{% /admonition %}\n{% /admonition %}\n")]
#[case::stray_closing("Text\n:::\n", "Text\n:::\n")]
#[case::wraps_code_sample(":::note\n```md\n:::tip\n:::\n```\n:::\n", "{% admonition type=\"note\" %}\n```md\n:::tip\n:::\n```\n{% /admonition %}\n")]
fn admonitions(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(rewrite_admonitions(input), expected);
}

#[test]
fn embeds_record_partial_folders() {
	let mut folders = PartialFolders::default();
	let output = rewrite_embeds(
		"Intro\n\n<embed src=\"../_partials/note.md\" />\n<embed src='/shared/snippets/x.md'/>\n",
		"guides/intro.md",
		&mut folders,
	);

	assert_eq!(
		output,
		"Intro\n\n{% partial file=\"../_partials/note.md\" /%}\n{% partial \
		 file=\"/shared/snippets/x.md\" /%}\n"
	);
	assert_eq!(
		folders.iter().cloned().collect::<Vec<_>>(),
		vec!["_partials".to_string(), "shared/snippets".to_string()]
	);
}

#[rstest]
#[case::free_text("```js Example title\nlet a = 1;\n```\n", "```js {% title=\"Example title\" %}\nlet a = 1;\n```\n")]
#[case::title_attribute("```rust title=\"main.rs\"\nfn main() {}\n```\n", "```rust {% title=\"main.rs\" %}\nfn main() {}\n```\n")]
#[case::tilde_fence("~~~bash Install\nnpm i\n~~~\n", "~~~bash {% title=\"Install\" %}\nnpm i\n~~~\n")]
#[case::no_title("```js\nlet a = 1;\n```\n", "```js\nlet a = 1;\n```\n")]
#[case::already_migrated("```js {% title=\"A\" %}\n```\n", "```js {% title=\"A\" %}\n```\n")]
fn code_fence_titles(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(rewrite_code_fence_titles(input), expected);
}

#[rstest]
#[case::relative_with_anchor("[C](../c.md#sec)", "[C](../d/c.md#sec)")]
#[case::image_with_title("![x](../c.md \"Title\")", "![x](../d/c.md \"Title\")")]
#[case::root_relative("[C](/c.md)", "[C](../d/c.md)")]
#[case::reference_definition("[c]: ../c.md\n", "[c]: ../d/c.md\n")]
#[case::external("[C](https://example.com/c.md)", "[C](https://example.com/c.md)")]
#[case::anchor_only("[C](#c.md)", "[C](#c.md)")]
#[case::unknown("[C](../other.md)", "[C](../other.md)")]
fn links_follow_renames(#[case] input: &str, #[case] expected: &str) -> DocshiftResult<()> {
	let registry = registry_with(&[("c.md", "d/c.md")])?;

	assert_eq!(rewrite_links(input, "a/b.md", &registry), expected);

	Ok(())
}

#[test]
fn links_into_reference_tags_are_lowercased() -> DocshiftResult<()> {
	let registry = registry_with(&[("api/petstore.page.yaml", "openapi/petstore.yaml")])?;

	assert_eq!(
		rewrite_links("[Pets](../api/petstore/tag/Pets#list)", "guides/intro.md", &registry),
		"[Pets](../api/petstore/pets#list)"
	);
	assert_eq!(
		rewrite_links("[Pets](../other/tag/Pets)", "guides/intro.md", &registry),
		"[Pets](../other/tag/Pets)"
	);

	Ok(())
}

#[test]
fn document_rewrites_are_idempotent() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	ctx.registry.record("c.md", "d/c.md")?;
	let text = "---\npermission: staff\nredirectFrom: /old\n---\n:::attention Read me\nSee [c](../c.md).\n:::\n\n<embed \
	            src=\"../_partials/x.md\" />\n\n```js Example\nlet a;\n```\n";

	let Some(first) = transform_document(text, "a/b.md", &mut ctx)? else {
		panic!("expected the legacy document to change");
	};
	let second = transform_document(&first, "a/b.md", &mut ctx)?;

	assert_eq!(second, None);
	assert!(first.contains("See [c](../d/c.md)."));
	assert!(first.contains("{% partial file=\"../_partials/x.md\" /%}"));

	Ok(())
}

#[rstest]
#[case::admonition("```md\n:::info\nx\n:::\n```\n")]
#[case::embed("~~~html\n<embed src=\"../_partials/x.md\" />\n~~~\n")]
#[case::inline_link("```md\nSee [c](../c.md).\n```\n")]
#[case::reference_definition("```md\n[c]: ../c.md\n```\n")]
#[case::title_in_longer_fence("````md\n```js Example\nlet a;\n```\n````\n")]
fn fenced_code_is_left_alone(#[case] text: &str) -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	ctx.registry.record("c.md", "d/c.md")?;

	assert_eq!(transform_document(text, "a/b.md", &mut ctx)?, None);
	assert!(ctx.partial_folders.is_empty());

	Ok(())
}

#[test]
fn rewrites_resume_after_a_fence() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	ctx.registry.record("c.md", "d/c.md")?;
	let text = "```md\n[c](../c.md)\n```\n\n[c](../c.md)\n";

	let result = transform_document(text, "a/b.md", &mut ctx)?;

	assert_eq!(
		result.as_deref(),
		Some("```md\n[c](../c.md)\n```\n\n[c](../d/c.md)\n")
	);

	Ok(())
}

#[test]
fn navigation_resolves_renames() -> DocshiftResult<()> {
	let mut ctx = MigrationContext::new();
	ctx.registry.record("guides/intro.mdx", "guides/intro.md")?;
	ctx.registry
		.record("api/petstore.page.yaml", "openapi/petstore.yaml")?;

	let original = yaml(
		r"
- label: Guides
  pages:
    - page: guides/intro.mdx
    - page: guides/setup.md
- page: api/petstore.page.yaml
  group: Petstore API
- page: api/petstore.page.yaml/*
  label: All endpoints
- page: guides/*
- label: External
  page: https://example.com/docs
",
	);
	let expected = yaml(
		r"
- label: Guides
  items:
    - page: guides/intro.md
    - page: guides/setup.md
- page: openapi/petstore.yaml
  label: Petstore API
- page: openapi/petstore.yaml
  label: All endpoints
- directory: guides
- label: External
  page: https://example.com/docs
",
	);

	let outputs = transform_tree_file(Path::new("."), &original, "sidebars.yaml", &mut ctx)?;

	assert_eq!(outputs.len(), 1);
	assert_eq!(outputs[0].path, "sidebars.yaml");
	assert!(outputs[0].changed);
	assert_eq!(outputs[0].value, expected);

	let again = transform_tree_file(Path::new("."), &outputs[0].value, "sidebars.yaml", &mut ctx)?;
	assert!(!again[0].changed);

	Ok(())
}

#[test]
fn navigation_paths_are_relative_to_the_tree() -> DocshiftResult<()> {
	let registry = registry_with(&[("guides/old.md", "guides/new/old.md")])?;
	let items = vec![yaml("page: old.md"), yaml("page: ../index.md")];

	let value = transform_tree(&items, "guides/sidebars.yaml", &registry)?;

	assert_eq!(value, yaml("[{page: new/old.md}, {page: ../index.md}]"));

	Ok(())
}

#[test]
fn navigation_keeps_unknown_fields_in_place() -> DocshiftResult<()> {
	let registry = RenameRegistry::new();
	let items = vec![yaml("{label: G, pages: [], expanded: true}"), yaml("separator: Tools")];

	let value = transform_tree(&items, "sidebars.yaml", &registry)?;
	let yaml_text = serde_yaml_ng::to_string(&value).unwrap_or_default();

	assert_eq!(
		yaml_text,
		"- label: G\n  items: []\n  expanded: true\n- separator: Tools\n"
	);

	Ok(())
}

#[test]
fn navigation_missing_collection_is_fatal() {
	let registry = RenameRegistry::new();
	let items = vec![yaml("page: api/missing.page.yaml")];

	let result = transform_tree(&items, "sidebars.yaml", &registry);

	assert!(matches!(
		result,
		Err(DocshiftError::MissingRename { ref page, ref tree })
			if page == "api/missing.page.yaml" && tree == "sidebars.yaml"
	));
}

#[test]
fn navigation_splits_named_trees() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let mut ctx = MigrationContext::new();
	let original = yaml("Main Docs:\n  - page: a.md\nAPI Reference:\n  - page: b.md\n");

	let outputs = transform_tree_file(tmp.path(), &original, "docs/sidebars.yaml", &mut ctx)?;
	let paths: Vec<&str> = outputs.iter().map(|output| output.path.as_str()).collect();

	assert_eq!(paths, vec!["docs/sidebars.yaml", "docs/api-reference-sidebars.yaml"]);
	assert!(outputs.iter().all(|output| output.changed));
	assert_eq!(outputs[1].value, yaml("[{page: b.md}]"));
	assert_eq!(ctx.instructions.len(), 1);

	Ok(())
}

#[rstest]
#[case::existing_file(&[("docs/api-reference-sidebars.yaml", "- page: keep.md\n")], "Main Docs:\n  - page: a.md\nAPI Reference:\n  - page: b.md\n")]
#[case::colliding_names(&[], "Main:\n  - page: a.md\nGuides:\n  - page: b.md\nguides:\n  - page: c.md\n")]
fn navigation_split_never_overwrites(
	#[case] existing: &[(&str, &str)],
	#[case] original: &str,
) -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(tmp.path(), existing)?;
	let mut ctx = MigrationContext::new();

	let outputs = transform_tree_file(tmp.path(), &yaml(original), "docs/sidebars.yaml", &mut ctx)?;

	assert!(outputs.is_empty());
	assert_eq!(ctx.instructions.len(), 1);
	assert!(ctx.instructions[0].contains("left unchanged"));

	Ok(())
}

#[rstest]
#[case::plain("# Title\n\nSome *text* and <div>html</div>.\n", true)]
#[case::import("import Tabs from './tabs'\n\n# Title\n", false)]
#[case::export("export const meta = {};\n", false)]
#[case::component("Text\n\n<Tabs>\n</Tabs>\n", false)]
#[case::component_in_fence("```jsx\n<Tabs />\nimport x from 'y'\n```\n", true)]
fn plain_markdown_detection(#[case] text: &str, #[case] expected: bool) {
	assert_eq!(is_plain_markdown(text), expected);
}

#[test]
fn credential_is_prompted_once() {
	let mut slot = CredentialSlot::default();
	let mut prompt = CountingPrompt {
		answer: Some(String::new()),
		calls: 0,
	};

	assert_eq!(slot.get_or_prompt(&mut prompt), None);
	assert_eq!(slot.get_or_prompt(&mut prompt), None);
	assert_eq!(prompt.calls, 1);
	assert!(slot.is_prompted());
}

#[test]
fn instructions_render_as_markdown() {
	let mut log = InstructionsLog::default();
	log.push("## `theme`\n\nRecreate the theme.\n");

	insta::assert_snapshot!(log.render(), @r"
	# Migration instructions

	The following items could not be migrated automatically and need a manual follow-up.

	## `theme`

	Recreate the theme.
	");
}

#[test]
fn listing_skips_excluded_and_build_directories() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			("a.md", ""),
			("docs/b.md", ""),
			("docs/c.mdx", ""),
			("node_modules/pkg/x.md", ""),
			(".git/y.md", ""),
			("dist/z.md", ""),
			("drafts/d.md", ""),
		],
	)?;

	let lister = FileLister::new(tmp.path(), &["drafts/".to_string()])?;

	assert_eq!(lister.list("**/*.md")?, vec!["a.md", "docs/b.md"]);
	assert_eq!(lister.list("*.md")?, vec!["a.md"]);

	Ok(())
}

#[test]
fn listing_rejects_invalid_pattern() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let lister = FileLister::new(tmp.path(), &[])?;

	assert!(matches!(
		lister.list("docs/{a"),
		Err(DocshiftError::InvalidPattern { .. })
	));

	Ok(())
}

#[test]
fn config_is_discovered() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[(
			".config/docshift.toml",
			"site_config = \"legacy/site.yaml\"\n\n[exclude]\npatterns = [\"drafts/\"]\n",
		)],
	)?;

	let config = DocshiftConfig::load_or_default(tmp.path())?;

	assert_eq!(config.site_config, Path::new("legacy/site.yaml"));
	assert_eq!(config.output_config, Path::new(DEFAULT_OUTPUT_CONFIG));
	assert_eq!(config.exclude.patterns, vec!["drafts/".to_string()]);

	Ok(())
}

#[test]
fn site_config_lists_definitions_and_defers_sections() -> DocshiftResult<()> {
	let site = LegacySiteConfig::parse(
		"oasDefinitions:\n  petstore: ./openapi/petstore.yaml\n  users:\n    url: \
		 https://example.com/users.yaml\ntheme: {}\nseo:\n  title: Docs\n",
		"siteConfig.yaml",
	)?;
	let mut ctx = MigrationContext::new();
	site.defer_unmigratable(&mut ctx);

	assert_eq!(
		site.oas_definitions.get("users").map(String::as_str),
		Some("https://example.com/users.yaml")
	);
	assert_eq!(site.oas_definitions.len(), 2);
	assert_eq!(ctx.instructions.len(), 2);

	Ok(())
}

#[test]
fn remote_definitions_share_one_credential_prompt() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			("api/pets.page.yaml", "type: reference-docs\ndefinitionId: pets\n"),
			(
				"api/users.page.yaml",
				"type: reference-docs\ndefinitionId: users\npermission: admin\n",
			),
		],
	)?;
	let site = LegacySiteConfig::parse(
		"oasDefinitions:\n  pets: https://example.com/pets\n  users: https://example.com/users\n",
		"siteConfig.yaml",
	)?;
	let descriptors = vec![
		"api/pets.page.yaml".to_string(),
		"api/users.page.yaml".to_string(),
	];
	let mut ctx = MigrationContext::new();
	let mut fetcher = StubFetcher {
		requested: Vec::new(),
		file_name: None,
	};
	let mut prompt = CountingPrompt {
		answer: Some("secret".to_string()),
		calls: 0,
	};
	let mut remote = RemoteAccess {
		fetcher: &mut fetcher,
		prompt: &mut prompt,
	};

	let summary = migrate_definitions(tmp.path(), &descriptors, &site, &mut ctx, &mut remote)?;

	assert_eq!(summary.downloaded, 2);
	assert_eq!(summary.relocated, 2);
	assert_eq!(prompt.calls, 1);
	assert_eq!(fetcher.requested, vec!["pets", "users"]);
	assert_eq!(ctx.registry.resolve("api/users.page.yaml"), Some("api/users.yaml"));
	assert_eq!(ctx.rbac.get("api/users.yaml"), Some(&Value::from("admin")));
	assert!(tmp.path().join("api/pets.yaml").is_file());
	assert!(!tmp.path().join("api/pets.page.yaml").exists());

	Ok(())
}

#[test]
fn declined_credential_skips_remote_definitions() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			("a.page.yaml", "definitionId: a\n"),
			("b.page.yaml", "definitionId: b\n"),
		],
	)?;
	let site = LegacySiteConfig::parse(
		"oasDefinitions:\n  a: https://example.com/a\n  b: https://example.com/b\n",
		"siteConfig.yaml",
	)?;
	let descriptors = vec!["a.page.yaml".to_string(), "b.page.yaml".to_string()];
	let mut ctx = MigrationContext::new();
	let mut prompt = CountingPrompt {
		answer: None,
		calls: 0,
	};
	let mut remote = RemoteAccess {
		fetcher: &mut OfflineFetcher,
		prompt: &mut prompt,
	};

	let summary = migrate_definitions(tmp.path(), &descriptors, &site, &mut ctx, &mut remote)?;

	assert_eq!(summary.skipped, 2);
	assert_eq!(prompt.calls, 1);
	assert_eq!(ctx.instructions.len(), 1);
	assert!(ctx.registry.is_empty());
	assert!(tmp.path().join("a.page.yaml").exists());

	Ok(())
}

#[test]
fn downloads_sharing_a_file_name_do_not_overwrite() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			("api/v1.page.yaml", "definitionId: v1\n"),
			("api/v2.page.yaml", "definitionId: v2\n"),
			("api/v3.page.yaml", "definitionId: v3\n"),
			("api/v3.yaml", "title: hand written\n"),
		],
	)?;
	let site = LegacySiteConfig::parse(
		"oasDefinitions:\n  v1: https://example.com/v1/openapi.yaml\n  v2: \
		 https://example.com/v2/openapi.yaml\n  v3: https://example.com/v3/openapi.yaml\n",
		"siteConfig.yaml",
	)?;
	let descriptors = vec![
		"api/v1.page.yaml".to_string(),
		"api/v2.page.yaml".to_string(),
		"api/v3.page.yaml".to_string(),
	];
	let mut ctx = MigrationContext::new();
	let mut fetcher = StubFetcher {
		requested: Vec::new(),
		file_name: Some("openapi.yaml"),
	};
	let mut prompt = CountingPrompt {
		answer: Some("secret".to_string()),
		calls: 0,
	};
	let mut remote = RemoteAccess {
		fetcher: &mut fetcher,
		prompt: &mut prompt,
	};

	let summary = migrate_definitions(tmp.path(), &descriptors, &site, &mut ctx, &mut remote)?;

	assert_eq!(summary.downloaded, 2);
	assert_eq!(summary.skipped, 1);
	assert_eq!(ctx.registry.resolve("api/v1.page.yaml"), Some("api/openapi.yaml"));
	assert_eq!(ctx.registry.resolve("api/v2.page.yaml"), Some("api/v2.yaml"));
	assert_eq!(ctx.registry.resolve("api/v3.page.yaml"), None);

	let read = |path: &str| std::fs::read_to_string(tmp.path().join(path));
	assert!(read("api/openapi.yaml")?.contains("title: v1"));
	assert!(read("api/v2.yaml")?.contains("title: v2"));
	assert_eq!(read("api/v3.yaml")?, "title: hand written\n");
	assert!(tmp.path().join("api/v3.page.yaml").is_file());

	Ok(())
}

#[test]
fn migration_runs_end_to_end() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			(
				"siteConfig.yaml",
				"oasDefinitions:\n  petstore: ./openapi/petstore.yaml\ntheme:\n  logo: logo.png\n",
			),
			("openapi/petstore.yaml", "openapi: 3.0.0\n"),
			(
				"api/petstore.page.yaml",
				"type: reference-docs\ndefinitionId: petstore\npermission: internal\n",
			),
			(
				"guides/intro.mdx",
				"---\nredirectFrom: /intro\n---\n:::note\nHello\n:::\n\nSee \
				 [Pets](../api/petstore/tag/Pets).\n<embed src=\"../_partials/footer.md\" />\n",
			),
			("guides/component.mdx", "import Tabs from './tabs'\n\n<Tabs />\n"),
			("guides/other.md", "[Intro](intro.mdx)\n"),
			("_partials/footer.md", "Footer\n"),
			(
				"sidebars.yaml",
				"- label: Guides\n  pages:\n    - page: guides/intro.mdx\n    - page: \
				 guides/other.md\n- page: api/petstore.page.yaml\n  group: Petstore\n",
			),
		],
	)?;
	let mut remote = RemoteAccess {
		fetcher: &mut OfflineFetcher,
		prompt: &mut NoCredential,
	};

	let report = run_migration(tmp.path(), &mut remote)?;

	assert_eq!(report.definitions_relocated, 1);
	assert_eq!(report.pages_converted, 1);
	assert_eq!(report.documents_updated, 2);
	assert_eq!(report.trees_updated, 1);
	assert_eq!(report.instructions.as_deref(), Some(DEFAULT_INSTRUCTIONS_FILE));

	let read = |path: &str| std::fs::read_to_string(tmp.path().join(path));
	let intro = read("guides/intro.md")?;
	assert!(intro.contains("{% admonition type=\"note\" %}"));
	assert!(intro.contains("[Pets](../api/petstore/pets)"));
	assert!(intro.contains("{% partial file=\"../_partials/footer.md\" /%}"));
	assert_eq!(read("guides/other.md")?, "[Intro](intro.md)\n");
	assert!(tmp.path().join("guides/component.mdx").is_file());

	let sidebars = yaml(&read("sidebars.yaml")?);
	assert_eq!(
		sidebars,
		yaml(
			"- label: Guides\n  items:\n    - page: guides/intro.md\n    - page: \
			 guides/other.md\n- page: openapi/petstore.yaml\n  label: Petstore\n"
		)
	);

	let site_config = yaml(&read(DEFAULT_OUTPUT_CONFIG)?);
	assert_eq!(
		site_config,
		yaml(
			"ignore: ['**/_*']\nrbac:\n  content:\n    openapi/petstore.yaml: \
			 internal\nmarkdown:\n  partialsFolders: [_partials]\n"
		)
	);

	let instructions = read(DEFAULT_INSTRUCTIONS_FILE)?;
	assert!(instructions.contains("`theme`"));
	assert!(instructions.contains("guides/component.mdx"));

	assert_eq!(check_migration(tmp.path())?, Vec::new());

	Ok(())
}

#[test]
fn migration_rerun_keeps_generated_site_config() -> DocshiftResult<()> {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_files(
		tmp.path(),
		&[
			("siteConfig.yaml", "oasDefinitions: {}\n"),
			(DEFAULT_OUTPUT_CONFIG, "theme:\n  colors: dark\n"),
			(
				"guides/admin.md",
				"---\npermission: admin\n---\n<embed src=\"../_partials/x.md\" />\n",
			),
			("_partials/x.md", "Partial\n"),
		],
	)?;
	let expected = yaml(
		"theme:\n  colors: dark\nignore: ['**/_*']\nrbac:\n  content:\n    guides/admin.md: \
		 admin\nmarkdown:\n  partialsFolders: [_partials]\n",
	);
	let read_config = || -> DocshiftResult<Value> {
		Ok(yaml(&std::fs::read_to_string(
			tmp.path().join(DEFAULT_OUTPUT_CONFIG),
		)?))
	};

	let first = run_migration(
		tmp.path(),
		&mut RemoteAccess {
			fetcher: &mut OfflineFetcher,
			prompt: &mut NoCredential,
		},
	)?;
	assert_eq!(first.documents_updated, 1);
	assert_eq!(read_config()?, expected);

	let second = run_migration(
		tmp.path(),
		&mut RemoteAccess {
			fetcher: &mut OfflineFetcher,
			prompt: &mut NoCredential,
		},
	)?;
	assert_eq!(second.documents_updated, 0);
	assert_eq!(read_config()?, expected);

	Ok(())
}

#[test]
fn site_config_merge_keeps_earlier_entries() {
	let (Value::Mapping(existing), Value::Mapping(generated)) = (
		yaml(
			"ignore: ['**/_*', drafts/a.md]\nrbac:\n  content:\n    a.md: admin\n    b.md: \
			 staff\n  teams: [x]\nseo: {title: Docs}\n",
		),
		yaml(
			"ignore: ['**/_*', c.md]\nrbac:\n  content:\n    b.md: admin\nmarkdown:\n  \
			 partialsFolders: [_partials]\n",
		),
	) else {
		panic!("site config fixtures must be mappings");
	};

	let merged = merge_site_config(existing, generated);

	assert_eq!(
		Value::Mapping(merged),
		yaml(
			"ignore: ['**/_*', drafts/a.md, c.md]\nrbac:\n  content:\n    a.md: admin\n    \
			 b.md: admin\n  teams: [x]\nseo: {title: Docs}\nmarkdown:\n  partialsFolders: \
			 [_partials]\n",
		)
	);
}

#[test]
fn migration_requires_site_config() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let mut remote = RemoteAccess {
		fetcher: &mut OfflineFetcher,
		prompt: &mut NoCredential,
	};

	let result = run_migration(tmp.path(), &mut remote);

	assert!(matches!(result, Err(DocshiftError::MissingSiteConfig(_))));
}
