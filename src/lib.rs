//! Tollgate - Client-Side Request Admission Control
//!
//! This crate throttles outbound HTTP requests issued through a shared client
//! so that no two requests complete within the minimum interval derived from a
//! target maximum rate. Attempts that would exceed the rate are dropped at the
//! call site rather than queued or delayed; a dropped attempt never reaches
//! the network and yields an explicit no-response outcome.

pub mod client;
pub mod ratelimit;
pub mod config;
pub mod error;
