//! Database models.

pub mod envelope_tracking;

pub use envelope_tracking::{EnvelopeStatus, EnvelopeTracking, NewEnvelopeTracking};
