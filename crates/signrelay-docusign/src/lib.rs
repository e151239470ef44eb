//! DocuSign client for signrelay.
//!
//! Covers the two provider operations the relay consumes: exchanging JWT
//! grant credentials for a short-lived access token (with caching), and
//! creating an envelope with an event-notification subscription pointing
//! back at the relay's webhook endpoint.

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;

pub use auth::TokenCache;
pub use client::{DocuSignClient, EnvelopeSummary};
pub use config::{DocuSignCredentials, DocuSignEnvironment};
pub use envelope::{build_envelope_definition, EnvelopeDefinition, SignerInfo};
pub use error::{DocuSignError, DocuSignResult};
