//! Watch command - stream published auth states until interrupted.

use anyhow::Result;
use chrono::Local;
use console::style;

use crate::commands::start_engine;
use crate::ui;
use fellowship_core::Config;

/// Run the watch command.
pub async fn run_watch(config: &Config) -> Result<()> {
    let engine = start_engine(config)?;
    let mut states = engine.subscribe();

    ui::info("Watching auth state, press Ctrl-C to stop");
    loop {
        let state = states.borrow_and_update().clone();
        println!("\n{}", style(Local::now().format("%H:%M:%S")).dim());
        ui::auth_state(&state);

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Could not listen for Ctrl-C");
                }
                break;
            }
        }
    }

    engine.shutdown();
    ui::success("Stopped");
    Ok(())
}
