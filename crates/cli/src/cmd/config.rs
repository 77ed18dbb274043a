//! Configuration management command
//!
//! Provides CLI interface to view and edit system configuration.

use anyhow::{Context, Result};
use cli_lib::config::{self, KEYS};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = config::load()?;
    let config_path = config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!(
        "{}: {}\n",
        "Location".dimmed(),
        config_path.display().dimmed()
    );

    let mut section = "";
    for key in KEYS.iter().copied() {
        let (prefix, name) = key.split_once('.').unwrap_or(("", key));
        if prefix != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }
        println!("  {} = {}", name.cyan(), config.get(key)?);
    }

    if config.autosave.attempt_timeout_ms == 0 {
        println!("\n{}", "Attempt timeout disabled".dimmed());
    }
    if config.gc.retain_hours == 0 {
        println!("{}", "GC time window disabled".dimmed());
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 10-60,000");
    println!("  max_retries: 1-20");
    println!("  base_delay_ms: 10-60,000; max_delay_ms: base_delay_ms-600,000");
    println!("  attempt_timeout_ms: 0 or 100-600,000");
    println!("  autosnapshot_every: 0-10,000 (0 = off)");
    println!("  retain_count: 1-1,000,000");
    println!("  retain_hours: 0-8760 (0 = no time limit)");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = config::load()?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = config::load()?;
    config.set(key, value)?;
    config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: running edit sessions keep their settings until restarted".yellow()
    );

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        config::init_if_missing()?;
        println!(
            "{} Created config file at: {}",
            "✓".green(),
            config_path.display()
        );
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!(
            "{}",
            "File does not exist. Use --create to create it.".yellow()
        );
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}
