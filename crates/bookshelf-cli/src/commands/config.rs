//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use bookshelf_core::Config;

use crate::output::{print_json, Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let settings = &config.persistence;

    match output.format {
        OutputFormat::Json => print_json(&json!({
            "data_dir": config.data_dir,
            "log_file": config.log_file,
            "persistence": settings,
        })),
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:        {}", config.data_dir.display());
            println!(
                "  log_file:        {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Persistence:");
            println!("  backend:         {}", settings.backend());
            println!("  store_name:      {}", settings.store_name());
            println!("  store_version:   {}", settings.store_version());
            println!("  record_set_name: {}", settings.record_set_name());
            println!("  key_field:       {}", settings.key_field());
            println!("  on_empty_load:   {:?}", settings.on_empty_load());
            println!(
                "  timeout:         {}",
                settings
                    .timeout()
                    .map(|t| format!("{} ms", t.as_millis()))
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
