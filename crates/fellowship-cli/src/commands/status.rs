//! Status command - resolve and show the current auth state.

use anyhow::Result;

use crate::commands::start_engine;
use crate::ui;
use fellowship_core::Config;

/// Status command arguments.
#[derive(Debug, Clone, Default)]
pub struct StatusArgs {
    /// Print the state as JSON.
    pub json: bool,
}

/// Run the status command.
pub async fn run_status(config: &Config, args: StatusArgs) -> Result<()> {
    let engine = start_engine(config)?;
    let state = engine.wait_resolved().await;
    engine.shutdown();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    ui::header("Fellowship Auth Status");
    ui::auth_state(&state);
    if !state.is_authenticated() {
        ui::info("Sessions are kept in memory only; use 'fellowship login' to check an account");
    }

    Ok(())
}
