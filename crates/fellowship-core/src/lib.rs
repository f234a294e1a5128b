//! # Fellowship Core
//!
//! Core identity types, the backend contract, and configuration for the
//! Fellowship site.
//!
//! This crate provides:
//! - Identity and session types shared by every other crate
//! - The `BackendGateway` trait the auth engine consumes
//! - Auth event types and a broadcast hub for gateway implementations
//! - Configuration loading and validation (JSON5 format)
//! - Secret wrappers and input validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod events;
pub mod gateway;
pub mod secrets;
pub mod types;
pub mod validation;

pub use config::{AuthSettings, BackendConfig, Config, ConfigError};
pub use events::{AuthEvent, AuthEventBroadcaster, AuthEventKind};
pub use gateway::{BackendGateway, GatewayError};
pub use secrets::{SecretToken, scrub_secrets};
pub use types::{Identity, Privilege, Session, UserId};
pub use validation::{ValidationError, normalize_email, validate_email, validate_password};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AuthSettings, Config};
    pub use crate::events::{AuthEvent, AuthEventKind};
    pub use crate::gateway::{BackendGateway, GatewayError};
    pub use crate::types::*;
}
