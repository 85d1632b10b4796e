//! Update-selection engine (spec §4.3): newest-first walk, mandatory
//! forwarding, diff substitution, and download-URL proxying.

pub mod engine;
pub mod proxy;
pub mod semver_range;

pub use engine::{select_update, DiffMapFetcher, UpdateCheckRequest, UpdateCheckResult};
