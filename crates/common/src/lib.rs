//! Error context helpers and the audit event fan-out used across hinata crates.

pub mod audit;
pub mod error;
pub mod http;

pub use {
    audit::{AuditEvent, AuditRegistry, AuditSink, TracingAuditSink},
    error::FromMessage,
    http::shared_http_client,
};
