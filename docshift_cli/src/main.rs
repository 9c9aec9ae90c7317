use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use docshift_cli::API_KEY_ENV;
use docshift_cli::Commands;
use docshift_cli::DocshiftCli;
use docshift_cli::OutputFormat;
use docshift_core::CredentialPrompt;
use docshift_core::DefinitionFetcher;
use docshift_core::DocshiftError;
use docshift_core::DocshiftResult;
use docshift_core::FetchedDefinition;
use docshift_core::MigrationReport;
use docshift_core::PendingChange;
use docshift_core::RemoteAccess;
use docshift_core::check_migration;
use docshift_core::run_migration;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;
use ureq::Agent;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// HTTP timeout for definition downloads.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = DocshiftCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminal support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Migrate { api_key }) => run_migrate(&args, api_key.clone()),
		Some(Commands::Check { diff, format }) => run_check(&args, *diff, *format),
		None => {
			eprintln!("No subcommand specified. Run `docshift --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render core errors through miette for help text and error codes.
		match e.downcast::<DocshiftError>() {
			Ok(docshift_err) => {
				let report: miette::Report = (*docshift_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &DocshiftCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_migrate(
	args: &DocshiftCli,
	api_key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut prompt = SuppliedCredential {
		credential: api_key.or_else(|| std::env::var(API_KEY_ENV).ok()),
	};
	let mut fetcher = HttpFetcher::new();
	let mut remote = RemoteAccess {
		fetcher: &mut fetcher,
		prompt: &mut prompt,
	};

	let report = run_migration(&root, &mut remote)?;
	print_report(&report);

	Ok(())
}

fn print_report(report: &MigrationReport) {
	println!("{}", colored!("Migration complete.", green));
	println!(
		"  definitions relocated: {} ({} downloaded)",
		report.definitions_relocated, report.definitions_downloaded
	);
	println!("  pages converted:       {}", report.pages_converted);
	println!("  documents updated:     {}", report.documents_updated);
	println!(
		"  navigation trees:      {} updated, {} split",
		report.trees_updated, report.trees_split
	);
	println!("  site config:           {}", report.output_config);

	if let Some(instructions) = &report.instructions {
		println!();
		println!(
			"{} {} item(s) need a manual follow-up. See {instructions}.",
			colored!("note:", yellow),
			report.instruction_count
		);
	}
}

fn run_check(
	args: &DocshiftCli,
	show_diff: bool,
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let pending = check_migration(&root)?;

	if pending.is_empty() {
		match format {
			OutputFormat::Json => println!("{{\"ok\":true,\"pending\":[]}}"),
			OutputFormat::Text => println!("Check passed: nothing left to migrate."),
		}
		return Ok(());
	}

	match format {
		OutputFormat::Json => {
			let files: Vec<&str> = pending.iter().map(|change| change.path.as_str()).collect();
			let output = serde_json::json!({
				"ok": false,
				"pending": files,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!();
			eprintln!("{}", colored!("Pending changes:", bold));
			for change in &pending {
				eprintln!("  {}", change.path);
				if show_diff {
					print_diff(change);
				}
			}
			eprintln!();
			eprintln!(
				"{} file(s) would change. Run `docshift migrate` to fix.",
				pending.len()
			);
		}
	}

	process::exit(1);
}

/// Print a unified diff between the current and migrated content, colorized.
fn print_diff(change: &PendingChange) {
	let diff = TextDiff::from_lines(&change.current, &change.updated);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// A credential decided up front, from `--api-key` or the environment.
struct SuppliedCredential {
	credential: Option<String>,
}

impl CredentialPrompt for SuppliedCredential {
	fn prompt(&mut self) -> Option<String> {
		self.credential.take()
	}
}

/// Downloads remote OpenAPI definitions over HTTP.
struct HttpFetcher {
	agent: Agent,
}

impl HttpFetcher {
	fn new() -> Self {
		let agent = Agent::config_builder()
			.timeout_global(Some(FETCH_TIMEOUT))
			.http_status_as_error(false)
			.build()
			.into();

		Self { agent }
	}
}

impl DefinitionFetcher for HttpFetcher {
	fn fetch(
		&mut self,
		id: &str,
		location: &str,
		credential: &str,
	) -> DocshiftResult<FetchedDefinition> {
		tracing::info!(id, location, "downloading remote definition");

		let fetch_error = |reason: String| {
			DocshiftError::Fetch {
				id: id.to_string(),
				reason,
			}
		};

		let response = self
			.agent
			.get(location)
			.header("Authorization", &format!("Bearer {credential}"))
			.header("Accept", "application/yaml, application/json")
			.call()
			.map_err(|e| fetch_error(e.to_string()))?;

		let status = response.status().as_u16();
		let mut body = response.into_body();
		let reconnect_note = format!(
			"The definition was previously loaded from `{location}`. Keep the downloaded copy in \
			 sync with that source, or point the API reference at the remote URL again."
		);

		if status == 404 {
			return Ok(FetchedDefinition {
				content: None,
				reconnect_note,
				file_name: definition_file_name(id, location),
			});
		}
		if status >= 400 {
			return Err(fetch_error(format!("server responded with status {status}")));
		}

		let content = body
			.read_to_string()
			.map_err(|e| fetch_error(e.to_string()))?;

		Ok(FetchedDefinition {
			content: Some(content),
			reconnect_note,
			file_name: definition_file_name(id, location),
		})
	}
}

/// The last path segment of the URL when it looks like a definition file,
/// otherwise `<id>.yaml`.
fn definition_file_name(id: &str, location: &str) -> String {
	let path = location.split(['?', '#']).next().unwrap_or(location);
	let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();

	if [".yaml", ".yml", ".json"]
		.iter()
		.any(|ext| last.ends_with(ext) && last.len() > ext.len())
	{
		last.to_string()
	} else {
		format!("{id}.yaml")
	}
}
