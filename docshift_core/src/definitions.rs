//! Relocation of legacy API reference descriptors (`*.page.yaml`).
//!
//! Each descriptor names an OpenAPI definition by identifier. The identifier
//! is looked up in the legacy site config's `oasDefinitions`, and the
//! descriptor's path is recorded in the rename registry as pointing at the
//! definition file itself. Remote definitions are downloaded next to the
//! descriptor first.

use std::path::Path;

use serde_yaml_ng::Value;

use crate::DocshiftResult;
use crate::config::LegacySiteConfig;
use crate::context::CredentialPrompt;
use crate::context::MigrationContext;
use crate::links::DEFINITION_DESCRIPTOR_SUFFIX;
use crate::paths::file_name;
use crate::paths::is_external;
use crate::paths::join;
use crate::paths::normalize_path;
use crate::paths::parent_dir;

const REFERENCE_DOCS_TYPE: &str = "reference-docs";

/// A definition returned by a [`DefinitionFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDefinition {
	/// The definition text, or `None` when the remote had nothing to offer.
	pub content: Option<String>,
	/// How to reconnect the migrated definition to its remote source.
	pub reconnect_note: String,
	/// Suggested file name for the downloaded definition.
	pub file_name: String,
}

/// Fetches remote OpenAPI definitions.
pub trait DefinitionFetcher {
	fn fetch(
		&mut self,
		id: &str,
		location: &str,
		credential: &str,
	) -> DocshiftResult<FetchedDefinition>;
}

/// A fetcher for runs without network access. Every remote definition is
/// reported back as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl DefinitionFetcher for OfflineFetcher {
	fn fetch(
		&mut self,
		id: &str,
		location: &str,
		_credential: &str,
	) -> DocshiftResult<FetchedDefinition> {
		Ok(FetchedDefinition {
			content: None,
			reconnect_note: format!(
				"Download `{location}` and add it to the project, then reference it from the \
				 navigation in place of the `{id}` descriptor."
			),
			file_name: format!("{id}.yaml"),
		})
	}
}

/// A credential prompt that always declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredential;

impl CredentialPrompt for NoCredential {
	fn prompt(&mut self) -> Option<String> {
		None
	}
}

/// The external collaborators needed for remote definitions.
pub struct RemoteAccess<'a> {
	pub fetcher: &'a mut dyn DefinitionFetcher,
	pub prompt: &'a mut dyn CredentialPrompt,
}

/// Counts for the definitions pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefinitionsSummary {
	pub relocated: usize,
	pub downloaded: usize,
	pub skipped: usize,
}

/// Relocate every descriptor in `descriptors` (root-relative paths).
pub fn migrate_definitions(
	root: &Path,
	descriptors: &[String],
	site: &LegacySiteConfig,
	ctx: &mut MigrationContext,
	remote: &mut RemoteAccess<'_>,
) -> DocshiftResult<DefinitionsSummary> {
	let mut summary = DefinitionsSummary::default();

	for descriptor in descriptors {
		let content = std::fs::read_to_string(root.join(descriptor))?;
		let value = match serde_yaml_ng::from_str::<Value>(&content) {
			Ok(value @ Value::Mapping(_)) => value,
			Ok(_) | Err(_) => {
				tracing::warn!(path = %descriptor, "unreadable page descriptor");
				ctx.instructions.push(format!(
					"## Page `{descriptor}`\n\nThe page descriptor could not be read and was left \
					 in place. Migrate it manually.\n"
				));
				summary.skipped += 1;
				continue;
			}
		};

		let kind = value.get("type").and_then(Value::as_str);
		let definition_id = value.get("definitionId").and_then(Value::as_str);
		if kind != Some(REFERENCE_DOCS_TYPE) && definition_id.is_none() {
			tracing::debug!(path = %descriptor, kind, "deferring non-reference page descriptor");
			ctx.instructions.push(format!(
				"## Page `{descriptor}`\n\nPage descriptors of type `{}` have no automatic \
				 migration. Recreate the page as markdown.\n",
				kind.unwrap_or("unknown")
			));
			summary.skipped += 1;
			continue;
		}

		let Some((id, location)) = definition_id
			.and_then(|id| site.oas_definitions.get(id).map(|location| (id, location)))
		else {
			tracing::warn!(
				path = %descriptor,
				id = definition_id,
				"no resolvable definition identifier, skipping"
			);
			ctx.instructions.push(format!(
				"## Page `{descriptor}`\n\nThe definition `{}` is not listed in `oasDefinitions`. \
				 Add the OpenAPI file to the project and reference it from the navigation.\n",
				definition_id.unwrap_or("(missing)")
			));
			summary.skipped += 1;
			continue;
		};

		let target = if is_external(location) {
			let Some(target) = download_definition(root, descriptor, id, location, ctx, remote)?
			else {
				summary.skipped += 1;
				continue;
			};
			summary.downloaded += 1;
			target
		} else {
			let Some(target) = normalize_path(location.trim_start_matches('/'))
				.filter(|target| root.join(target).is_file())
			else {
				tracing::warn!(path = %descriptor, location, "definition file not found");
				ctx.instructions.push(format!(
					"## Page `{descriptor}`\n\nThe definition `{id}` points at `{location}`, which \
					 does not exist.\n"
				));
				summary.skipped += 1;
				continue;
			};
			target
		};

		ctx.registry.record(descriptor, &target)?;
		if let Some(permission) = value.get("permission") {
			ctx.rbac.insert(target.clone(), permission.clone());
		}
		std::fs::remove_file(root.join(descriptor))?;
		tracing::info!(from = %descriptor, to = %target, "relocated reference page");
		summary.relocated += 1;
	}

	Ok(summary)
}

/// Download a remote definition next to its descriptor. Returns the new
/// root-relative path, or `None` when the definition was skipped.
fn download_definition(
	root: &Path,
	descriptor: &str,
	id: &str,
	location: &str,
	ctx: &mut MigrationContext,
	remote: &mut RemoteAccess<'_>,
) -> DocshiftResult<Option<String>> {
	let first_request = !ctx.credential.is_prompted();
	let Some(credential) = ctx
		.credential
		.get_or_prompt(remote.prompt)
		.map(ToString::to_string)
	else {
		if first_request {
			ctx.instructions.push(
				"## Remote definitions\n\nNo API credential was provided, so remote OpenAPI \
				 definitions were not downloaded. Download them manually and reference them from \
				 the navigation.\n",
			);
		}
		tracing::warn!(path = %descriptor, id, "skipping remote definition without credential");
		return Ok(None);
	};

	let fetched = match remote.fetcher.fetch(id, location, &credential) {
		Ok(fetched) => fetched,
		Err(e) => {
			tracing::warn!(path = %descriptor, id, "{e}");
			ctx.instructions.push(format!(
				"## Page `{descriptor}`\n\nThe remote definition `{id}` could not be downloaded: \
				 {e}\n"
			));
			return Ok(None);
		}
	};

	let Some(content) = fetched.content else {
		tracing::warn!(path = %descriptor, id, "remote definition unavailable");
		ctx.instructions.push(format!(
			"## Page `{descriptor}`\n\n{}\n",
			fetched.reconnect_note
		));
		return Ok(None);
	};

	let candidates = download_targets(descriptor, id, &fetched.file_name);
	let Some(target) = candidates
		.iter()
		.find(|candidate| !root.join(candidate).exists())
		.cloned()
	else {
		tracing::warn!(path = %descriptor, id, "every download target already exists");
		let taken = candidates
			.iter()
			.map(|candidate| format!("`{candidate}`"))
			.collect::<Vec<_>>()
			.join(" and ");
		let verb = if candidates.len() == 1 { "exists" } else { "exist" };
		ctx.instructions.push(format!(
			"## Page `{descriptor}`\n\nThe remote definition `{id}` was downloaded but not saved \
			 because {taken} already {verb}. {}\n",
			fetched.reconnect_note
		));
		return Ok(None);
	};

	std::fs::write(root.join(&target), content)?;
	ctx.instructions.push(format!(
		"## Definition `{id}`\n\nDownloaded to `{target}`. {}\n",
		fetched.reconnect_note
	));

	Ok(Some(target))
}

/// Root-relative places a downloaded definition may be written to, in order
/// of preference: the suggested file name next to the descriptor, then the
/// descriptor's own stem with the same extension.
fn download_targets(descriptor: &str, id: &str, suggested: &str) -> Vec<String> {
	let base_name = suggested
		.rsplit('/')
		.next()
		.filter(|name| !name.is_empty())
		.map_or_else(|| format!("{id}.yaml"), ToString::to_string);
	let extension = base_name
		.rfind('.')
		.filter(|idx| *idx > 0)
		.map_or(".yaml", |idx| &base_name[idx..]);
	let stem = file_name(descriptor)
		.strip_suffix(DEFINITION_DESCRIPTOR_SUFFIX)
		.unwrap_or(id);

	let dir = parent_dir(descriptor);
	let mut targets = Vec::with_capacity(2);
	for name in [base_name.clone(), format!("{stem}{extension}")] {
		let target = join(dir, &name).unwrap_or(name);
		if !targets.contains(&target) {
			targets.push(target);
		}
	}

	targets
}
