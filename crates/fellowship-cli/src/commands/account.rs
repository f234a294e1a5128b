//! Login and signup commands.
//!
//! Both run a full engine round trip: act, wait for the engine to publish
//! the resulting identity and admin flag, print it, then sign out again.

use anyhow::{Context, Result};

use crate::commands::start_engine;
use crate::ui;
use fellowship_auth::{AuthEngine, AuthError, AuthState};
use fellowship_core::{Config, GatewayError, Identity};

/// Login command arguments.
#[derive(Debug, Clone, Default)]
pub struct LoginArgs {
    /// Email address; prompted for when missing.
    pub email: Option<String>,
}

/// Signup command arguments.
#[derive(Debug, Clone, Default)]
pub struct SignupArgs {
    /// Email address; prompted for when missing.
    pub email: Option<String>,
    /// Display name stored with the account.
    pub name: Option<String>,
}

/// Run the login command.
pub async fn run_login(config: &Config, args: LoginArgs) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => ui::prompts::input("Email")?,
    };
    let password = ui::prompts::password("Password")?;

    let engine = start_engine(config)?;
    engine.wait_resolved().await;

    let result = engine.sign_in(&email, &password).await;
    let identity = report_failure(result).context("Login failed")?;

    finish(config, engine, &identity).await
}

/// Run the signup command.
pub async fn run_signup(config: &Config, args: SignupArgs) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => ui::prompts::input("Email")?,
    };
    let name = match args.name {
        Some(name) => Some(name),
        None => ui::prompts::input_optional("Display name (optional)")?,
    };
    let password = ui::prompts::new_password("Password")?;

    let engine = start_engine(config)?;
    engine.wait_resolved().await;

    let result = engine.sign_up(&email, &password, name.as_deref()).await;
    let identity = report_failure(result).context("Signup failed")?;
    ui::success("Account created");

    finish(config, engine, &identity).await
}

fn report_failure(result: Result<Identity, AuthError>) -> Result<Identity, AuthError> {
    if let Err(e) = &result {
        ui::error(&failure_hint(e));
    }
    result
}

/// User-facing explanation for a failed sign-in or sign-up.
fn failure_hint(error: &AuthError) -> String {
    match error {
        AuthError::Validation(e) => format!("Check your input: {e}"),
        AuthError::SignIn(GatewayError::InvalidCredentials)
        | AuthError::SignUp(GatewayError::InvalidCredentials) => {
            "Email or password not accepted".to_string()
        }
        other => other.to_string(),
    }
}

/// Wait for the engine to publish the signed-in identity, show it, and sign
/// out again.
async fn finish(config: &Config, engine: AuthEngine, identity: &Identity) -> Result<()> {
    let deadline = config.auth.safety_deadline();
    let published = tokio::time::timeout(
        deadline,
        engine.wait_until(|state| is_published(state, identity)),
    )
    .await;

    match published {
        Ok(state) => {
            ui::success("Signed in");
            ui::auth_state(&state);
        }
        Err(_) => {
            ui::warning("Signed in, but the auth state was not updated in time");
            ui::auth_state(&engine.state());
        }
    }

    if let Err(e) = engine.sign_out().await {
        ui::warning(&format!("{e} (local session already cleared)"));
    }
    engine.shutdown();
    Ok(())
}

fn is_published(state: &AuthState, identity: &Identity) -> bool {
    state.identity().is_some_and(|current| current.id == identity.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fellowship_core::ValidationError;

    #[test]
    fn test_failure_hints() {
        assert_eq!(
            failure_hint(&AuthError::SignIn(GatewayError::InvalidCredentials)),
            "Email or password not accepted"
        );
        assert!(
            failure_hint(&AuthError::Validation(ValidationError::PasswordTooShort { min: 6 }))
                .starts_with("Check your input")
        );
        assert!(
            failure_hint(&AuthError::SignUp(GatewayError::Transport("timed out".to_string())))
                .contains("timed out")
        );
    }

    #[test]
    fn test_published_state_must_match_identity() {
        let frodo = Identity::new("frodo", None);
        let sam = Identity::new("sam", None);

        assert!(is_published(&AuthState::authenticated(frodo.clone(), false), &frodo));
        assert!(!is_published(&AuthState::authenticated(sam, false), &frodo));
        assert!(!is_published(&AuthState::anonymous(), &frodo));
    }
}
