//! # yurt-content
//!
//! Content access for Yurt: the layer that turns a [`yurt_schema::Config`]
//! plus a branch into structured records, and structured records back into
//! file commits.
//!
//! ## Key components
//!
//! - [`fetch::fetch_content`] — read records for any of the three storage
//!   shapes.
//! - [`write`] — plan and apply mutations. Every mutation is first computed
//!   as a [`write::FileChange`] plan (exact paths, before/after bytes), then
//!   applied through the commit orchestrator. The change-preview surface in
//!   `yurt-draft` shows the same plans without applying them, so previews
//!   can never drift from what a save would actually do.
//! - [`discovery`] — walk a repository tree for `*.yurt.json` declarations.
//! - [`cache::ContentCache`] — short-TTL memoization of discovery and
//!   content reads, keyed per repo/config/branch.
//! - [`commit`] — the sha-fetch-then-write protocol and commit messages.

pub mod cache;
pub mod commit;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod frontmatter;
pub mod query;
pub mod record;
pub mod template;
pub mod validate;
pub mod write;

pub use cache::{CacheStat, Clock, ContentCache, SystemClock};
pub use discovery::{discover, DiscoveredConfig, CONFIG_SUFFIX};
pub use error::ContentError;
pub use fetch::fetch_content;
pub use record::{Content, Record, BODY_KEY, FILENAME_KEY};
pub use validate::{validate_record, ValidationIssue};
pub use write::{FileChange, FileOp};
