//! Turnstile - Per-Client Request Rate Limiting
//!
//! This crate implements a per-client request rate limiter for network
//! services. The limiter tracks request counts over fixed time windows
//! keyed by a compact numeric client identity derived from the client's
//! IPv4 address. A demonstration HTTP server wires the limiter in front
//! of a simple time page.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
