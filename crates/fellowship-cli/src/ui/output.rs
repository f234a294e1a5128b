//! Formatted output utilities.

use console::style;

use fellowship_auth::{AuthState, Phase};

/// Print a success message with checkmark.
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message with X.
pub fn error(msg: &str) {
    println!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header/section title.
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair.
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).bold(), value);
}

/// Rows describing an auth state, in display order.
pub fn state_rows(state: &AuthState) -> Vec<(&'static str, String)> {
    let phase = match state.phase() {
        Phase::Initializing => "initializing",
        Phase::Resolved => "resolved",
    };

    let mut rows = vec![("Phase", phase.to_string())];
    match state.identity() {
        Some(identity) => {
            rows.push(("User", identity.id.to_string()));
            if let Some(email) = &identity.email {
                rows.push(("Email", email.clone()));
            }
            let name = identity
                .display_name()
                .filter(|n| Some(*n) != identity.email.as_deref());
            if let Some(name) = name {
                rows.push(("Name", name.to_string()));
            }
        }
        None => rows.push(("User", "signed out".to_string())),
    }
    rows.push(("Admin", if state.is_admin() { "yes" } else { "no" }.to_string()));
    rows
}

/// Print an auth state as key-value pairs.
pub fn auth_state(state: &AuthState) {
    for (key, value) in state_rows(state) {
        kv(key, &value);
    }
}
