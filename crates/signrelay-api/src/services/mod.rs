//! API services.

pub mod decode;
pub mod lifecycle;
pub mod notifier;
pub mod submission;
