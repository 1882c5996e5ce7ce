//! Site registration registry for domain ownership claims
//!
//! A site registration binds a domain to the wallet claiming it and to the
//! verification token the claimant must publish. This crate owns the record
//! type, the input rules for domains and wallets, the token issuer, the store
//! abstraction with its in-memory backend, and the registration service that
//! keeps at most one unverified claim per domain.

pub mod errors;
pub mod registry;
pub mod service;
pub mod token;
pub mod types;

pub use errors::*;
pub use registry::{MemorySiteRegistrationStore, SiteRegistrationStore};
pub use service::{Registered, RegistrationService};
pub use token::{TokenIssuer, UuidTokenIssuer, TOKEN_PREFIX};
pub use types::*;
