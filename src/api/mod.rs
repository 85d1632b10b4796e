//! # Acquisition HTTP API
//!
//! The mobile-client-facing surface of the acquisition service: the
//! update-check read path (tiered microcache → distributed cache →
//! storage), the two report-status write paths, and `/health`.
//!
//! ```text
//! Client ──GET /updateCheck──▶ handlers::update_check_legacy
//!                                  │
//!                                  ├─▶ microcache hit? ──▶ selection::select_update ──▶ respond
//!                                  │
//!                                  └─▶ distributed cache hit? ──▶ selection::select_update ──▶ respond
//!                                                │
//!                                                └─▶ storage::HistoryStore ──▶ selection::select_update ──▶ respond
//! ```
//!
//! Every operation is exposed under both a legacy camelCase path and a
//! new snake_case `v0.1` path (spec §6); both share `handlers` and
//! differ only in the wire-format structs in `responses`.

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
