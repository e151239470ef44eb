//! Database layer for signrelay.
//!
//! Provides the connection pool, embedded migrations, and the
//! `envelope_tracking` table model that correlates provider envelope ids
//! with the original requester's callback.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{EnvelopeStatus, EnvelopeTracking, NewEnvelopeTracking};
pub use pool::DbPool;
