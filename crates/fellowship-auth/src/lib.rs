//! # Fellowship Auth
//!
//! Client-side resolution of who the visitor is and whether they are an admin.
//!
//! The engine publishes a single `AuthState` that leaves `Initializing`
//! exactly once: when startup resolution finishes or the safety deadline
//! fires, whichever comes first. Live auth events keep it current after that.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use fellowship_core::{GatewayError, ValidationError};
use thiserror::Error;

pub mod admin;
mod bootstrap;
mod engine;
mod signout;
pub mod state;
mod subscriber;
mod supervisor;

#[cfg(test)]
mod testing;

pub use admin::{AdminDecision, AdminResolver};
pub use engine::AuthEngine;
pub use state::{AuthState, Phase, Resolution};

/// Errors surfaced to callers of the engine's user actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Input rejected before reaching the backend.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Backend refused the sign-in.
    #[error("Sign-in failed: {0}")]
    SignIn(GatewayError),

    /// Backend refused the sign-up.
    #[error("Sign-up failed: {0}")]
    SignUp(GatewayError),

    /// Remote sign-out failed. Local state is already cleared.
    #[error("Sign-out failed: {0}")]
    SignOut(GatewayError),
}
