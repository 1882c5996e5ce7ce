//! Domain ownership verification
//!
//! A claimant proves control of a domain by publishing the registration's
//! verification token in one of three places:
//!
//! - a TXT record at `_scrapesafe.<domain>` ([`DnsTxtCheck`])
//! - a `<meta name="scrapesafe">` tag on the site root ([`MetaTagCheck`])
//! - `/.well-known/scrapesafe.json` ([`WellKnownFileCheck`])
//!
//! Every check implements [`OwnershipCheck`] and reports a pass/fail
//! [`VerificationOutcome`] with a troubleshooting detail; none of them touch
//! registration state. [`SiteVerifier`] dispatches on [`VerificationMethod`]
//! and flips the registration to verified on success.

pub mod dns;
pub mod errors;
pub mod http;
pub mod instructions;
pub mod meta_tag;
pub mod method;
pub mod strategy;
pub mod verifier;
pub mod well_known;

pub use dns::{DnsTxtCheck, HickoryTxtResolver, StaticTxtResolver, TxtLookup, TxtResolver};
pub use errors::*;
pub use instructions::VerificationInstructions;
pub use meta_tag::MetaTagCheck;
pub use method::VerificationMethod;
pub use strategy::{OwnershipCheck, VerificationConfig, VerificationOutcome};
pub use verifier::{SiteVerifier, StrategySet, VerificationReport};
pub use well_known::WellKnownFileCheck;
