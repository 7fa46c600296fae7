//! API layer
//!
//! HTTP handlers for:
//! - Upload / list / download / delete against the bucket
//! - Metrics (Prometheus)

pub mod metrics;
mod upload;

pub use metrics::metrics_router;
pub use upload::{ListResponse, MessageResponse, UploadResponse, upload_router};
