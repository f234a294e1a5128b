//! # Fellowship Backend
//!
//! `BackendGateway` implementation for a hosted auth + data backend:
//! GoTrue-style credential endpoints and a PostgREST-style admin table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rest;
mod wire;

pub use rest::RestGateway;
