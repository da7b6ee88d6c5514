//! Request admission gate: fixed-window rate limiting in front of a web app.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use admission::{AdmissionGate, Verdict};
pub use config::GateConfig;
pub use error::GateError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
