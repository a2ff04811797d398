//! GitHub REST API access for prlabeler.

pub mod client;
pub mod paginate;

pub use client::GitHubClient;
pub use paginate::Paginator;
