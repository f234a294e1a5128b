//! Config show/path/validate/init command.

use crate::ui;
use anyhow::Result;
use std::path::Path;

use fellowship_core::Config;

/// Config subcommand.
#[derive(Debug, Clone, Default)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets hidden.
    #[default]
    Show,
    /// Print the config file path.
    Path,
    /// Validate the config file.
    Validate,
    /// Write a new config file.
    Init {
        /// Backend URL.
        url: Option<String>,
        /// Backend anon key.
        anon_key: Option<String>,
        /// Overwrite an existing file without asking.
        force: bool,
    },
}

/// Config command arguments.
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    /// What to do.
    pub action: ConfigAction,
}

/// Run the config command.
pub async fn run_config(args: ConfigArgs) -> Result<()> {
    let config_path = Config::default_path();

    match args.action {
        ConfigAction::Show => show_config(&config_path),
        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigAction::Validate => {
            if validate_config(&config_path) {
                Ok(())
            } else {
                anyhow::bail!("Configuration is not usable")
            }
        }
        ConfigAction::Init {
            url,
            anon_key,
            force,
        } => init_config(&config_path, url, anon_key, force),
    }
}

/// Show the effective configuration.
fn show_config(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        ui::warning(&format!(
            "Config file not found: {} (showing defaults)",
            config_path.display()
        ));
    }

    let config = Config::load_default()?;
    println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
    Ok(())
}

/// Config as JSON with the anon key hidden.
fn redacted(config: &Config) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(key) = value.pointer_mut("/backend/anonKey") {
        if !key.is_null() {
            *key = serde_json::Value::String("[REDACTED]".to_string());
        }
    }
    Ok(value)
}

/// Validate the configuration, reporting each stage.
fn validate_config(config_path: &Path) -> bool {
    ui::header("Validating Configuration");

    if !config_path.exists() {
        ui::error(&format!("Config file not found: {}", config_path.display()));
        return false;
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            ui::error(&format!("Cannot read config: {e}"));
            return false;
        }
    };

    if let Err(e) = json5::from_str::<serde_json::Value>(&content) {
        ui::error(&format!("Syntax error: {e}"));
        return false;
    }
    ui::success("Syntax: Valid JSON5");

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            ui::error(&format!("Schema error: {e}"));
            return false;
        }
    };
    ui::success("Schema: Configuration is valid");

    let warnings = missing_backend_fields(&config);
    if warnings.is_empty() {
        ui::success("Backend: URL and anon key present");
    }
    for warning in &warnings {
        ui::warning(warning);
    }
    warnings.is_empty()
}

fn missing_backend_fields(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Err(e) = config.backend.require_url() {
        warnings.push(e.to_string());
    }
    if let Err(e) = config.backend.require_anon_key() {
        warnings.push(e.to_string());
    }
    warnings
}

/// Write a config file, prompting for missing backend details.
fn init_config(
    config_path: &Path,
    url: Option<String>,
    anon_key: Option<String>,
    force: bool,
) -> Result<()> {
    if config_path.exists()
        && !force
        && !ui::prompts::confirm(&format!("Overwrite {}?", config_path.display()))?
    {
        ui::info("Config left unchanged");
        return Ok(());
    }

    let url = match url {
        Some(url) => url,
        None => ui::prompts::input("Backend URL")?,
    };
    let anon_key = match anon_key {
        Some(key) => key,
        None => ui::prompts::password("Backend anon key")?,
    };

    write_config(config_path, &url, &anon_key)?;
    ui::success(&format!("Config written to {}", config_path.display()));
    Ok(())
}

fn write_config(path: &Path, url: &str, anon_key: &str) -> Result<Config> {
    let mut config = Config::default();
    config.backend.url = Some(url.trim().to_string());
    config.backend.anon_key = Some(anon_key.trim().to_string());
    config.validate()?;
    config.save(path)?;
    Ok(config)
}
