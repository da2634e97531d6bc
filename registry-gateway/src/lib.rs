//! # Registry Gateway
//!
//! `registry-gateway` submits documents to a remote registry
//! (`POST <base>/api/v3/lk/documents/create`) without ever exceeding the
//! registry's request rate, no matter how many tasks submit at once.
//!
//! ## Two layers of protection
//!
//! 1. **Pacing**: A [`pace_limit::RateLimiter`] spaces admissions evenly at the
//!    configured rate, across all callers. Idle time is never saved up for a
//!    burst.
//! 2. **One in flight**: The outbound channel sits behind an async mutex and is
//!    held for the whole HTTP exchange. Two permits granted back to back still
//!    produce two strictly sequential requests.
//!
//! Both are needed: pacing alone would let a slow request overlap the next one.
//!
//! ## Errors
//!
//! Every failure comes back as a [`GatewayError`] with a distinct kind and
//! exit code. The gateway never retries; that decision belongs to the caller,
//! for instance by stacking `tower` middleware on a [`SubmitService`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use registry_gateway::Document;
//! use registry_gateway::SubmissionGateway;
//!
//! # async fn run() -> Result<(), registry_gateway::GatewayError> {
//! let gateway = Arc::new(SubmissionGateway::new("https://ismp.crpt.ru", 1.0)?);
//!
//! let body = gateway.submit(&Document::sample(), "signature").await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod gateway;
mod service;
mod transport;


pub use document::Description;
pub use document::Document;
pub use document::LP_INTRODUCE_GOODS;
pub use document::Product;
pub use error::GatewayError;
pub use gateway::CREATE_DOCUMENT_PATH;
pub use gateway::SubmissionGateway;
pub use service::Submission;
pub use service::SubmitService;
pub use transport::HttpTransport;
pub use transport::SIGNATURE_HEADER;
pub use transport::TransportRequest;
pub use transport::TransportResponse;
