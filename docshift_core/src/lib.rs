//! `docshift_core` is the migration engine behind the `docshift` command. It
//! moves a documentation site from the legacy portal schema to the new content
//! schema: markup is rewritten into Markdoc tags, API reference descriptors are
//! replaced by their definition files, navigation trees are restructured, and
//! every internal reference is kept pointing at the right file along the way.
//!
//! ## Processing Pipeline
//!
//! ```text
//! siteConfig.yaml + docshift.toml
//!   -> definitions pass (*.page.yaml replaced by OpenAPI files, renames recorded)
//!   -> formats pass (plain .mdx renamed to .md, renames recorded)
//!   -> documents (admonitions, embeds, fence titles, frontmatter, links)
//!   -> navigation trees (sidebars.yaml resolved against the rename registry)
//!   -> redocly.yaml + MIGRATION_INSTRUCTIONS.md
//! ```
//!
//! ## Key Types
//!
//! - [`MigrationContext`]: the run-scoped state threaded through every phase.
//! - [`RenameRegistry`]: original path to relocated path, append-only.
//! - [`NavNode`]: one navigation entry, tagged by kind, with its unknown
//!   fields carried through untouched.
//! - [`DocshiftConfig`]: optional tool configuration from `docshift.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use docshift_core::NoCredential;
//! use docshift_core::OfflineFetcher;
//! use docshift_core::RemoteAccess;
//! use docshift_core::run_migration;
//!
//! let mut remote = RemoteAccess {
//!     fetcher: &mut OfflineFetcher,
//!     prompt: &mut NoCredential,
//! };
//! let report = run_migration(Path::new("."), &mut remote).unwrap();
//! println!("{} documents updated", report.documents_updated);
//! ```

pub use config::*;
pub use context::*;
pub use definitions::*;
pub use equality::*;
pub use error::*;
pub use fences::*;
pub use formats::*;
pub use frontmatter::*;
pub use links::*;
pub use listing::*;
pub use markup::*;
pub use migrate::*;
pub use navigation::*;
pub use registry::*;

pub mod config;
mod context;
mod definitions;
mod equality;
#[allow(unused_assignments)]
mod error;
mod fences;
mod formats;
mod frontmatter;
mod links;
mod listing;
mod markup;
mod migrate;
mod navigation;
pub mod paths;
mod registry;

#[cfg(test)]
mod __tests;
