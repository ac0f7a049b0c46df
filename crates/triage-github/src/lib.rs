//! Issue-store capability and its GitHub REST and in-memory implementations.
//!
//! The store hides whether the bot runs against one repository or a set of
//! repositories; callers pass an optional `RepoRef` and the store resolves the
//! owning repository when it is absent.

mod github_api_client;
pub mod github_store;
pub mod issue_store;
pub mod memory_store;

pub use github_store::{GithubIssueStore, GithubStoreConfig, RepoScope};
pub use issue_store::{IssueStore, IssueUpdate, NewIssue, StoreMode};
pub use memory_store::{InMemoryIssueStore, RecordedComment};
