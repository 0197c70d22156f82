//! HTTP API modules.

pub mod payments;
