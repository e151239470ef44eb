//! HTTP API for signrelay.
//!
//! Envelope submission, webhook normalization and lifecycle updates, and
//! outbound terminal-state notification toward the requester's callback.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod validation;

pub use error::{ApiError, ApiResult};
pub use router::{api_router, ApiState};
pub use services::notifier::{notifier_channel, NotifierHandle, NotifierService, NotifierWorker};
pub use services::submission::{ProviderConfig, SubmissionService};
