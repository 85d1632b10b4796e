//! Mobile-client-facing acquisition service for a code-push style
//! over-the-air update platform (see `SPEC_FULL.md`).
//!
//! The core subsystems: [`selection`] (update-selection engine),
//! [`microcache`] and [`cache`] (the tiered cache), and [`metrics`]
//! (the fire-and-forget counter pipeline). [`api`] wires these into the
//! HTTP surface; [`storage`] defines the out-of-scope collaborator
//! traits (release history, diff-package archives).

pub mod api;
pub mod cache;
pub mod cachekey;
pub mod config;
pub mod error;
pub mod metrics;
pub mod microcache;
pub mod model;
pub mod rollout;
pub mod selection;
pub mod storage;
pub mod version;

pub use config::AppConfig;
pub use error::AcquisitionError;
