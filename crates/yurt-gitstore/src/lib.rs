//! # yurt-gitstore
//!
//! Backing repository access for Yurt.
//!
//! Yurt keeps all content inside a hosted git repository and never runs a
//! local clone. This crate defines the [`RepoStore`] trait — the exact API
//! surface the engine needs from a repository host — plus two
//! implementations:
//!
//! - [`GithubStore`] — the production implementation against the GitHub
//!   REST API.
//! - [`MemoryStore`] — an in-memory repository with branches, per-file
//!   shas, and stale-sha write rejection. Used as the test double across
//!   the workspace.
//!
//! Errors carry the retry-vs-surface distinction callers need: a 404 is
//! [`StoreError::NotFound`], stale-sha and protected-branch rejections are
//! [`StoreError::Conflict`], and rate limiting is [`StoreError::Transient`].

pub mod error;
pub mod github;
pub mod memory;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use github::GithubStore;
pub use memory::MemoryStore;
pub use store::RepoStore;
pub use types::{
    BranchSummary, CommitInfo, Comparison, DirEntry, EntryKind, FileContent, TreeEntry,
};
