//! Fieldguard - In-memory abuse control for field-operations APIs
//!
//! This crate implements fixed-window rate limiting for a retail
//! field-operations backend. Named policies (general, heavy operation,
//! database-intensive, Excel downloads by address or by user) count requests
//! in two shared in-memory stores, and a background reclaimer drops counters
//! that have been idle well past their window.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
