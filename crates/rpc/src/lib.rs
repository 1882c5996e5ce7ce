//! ScrapeSafe HTTP API
//!
//! Axum router exposing site registration, lookup, listing and ownership
//! verification under `/api/owner`, plus `/health`, `/version` and
//! `/metrics`.

pub mod ip_asset;
pub mod server;
pub mod sites;

#[cfg(test)]
mod sites_tests;

pub use ip_asset::{IpAssetReceipt, IpAssetRegistrar, SimulatedIpRegistrar};
pub use server::{build_router, start_server, ApiError, AppState};
