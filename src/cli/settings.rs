use anyhow::{anyhow, bail, Result};
use std::env;

use super::ConfigCommands;
use crate::config::{self, ConfigKey, ALL_KEYS};
use crate::db::Database;

/// Execute a config subcommand.
pub fn run_config(db: &Database, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let key = find_key(&key)?;
            let value = value.trim();
            if value.is_empty() {
                bail!("Value cannot be empty; use 'leadcmd config unset {}'", key.setting);
            }
            db.set_setting(key.setting, value)?;
            println!("Set {} = {}", key.setting, display_value(key, value));
            if env::var(key.env).is_ok_and(|v| !v.trim().is_empty()) {
                println!("Note: {} is set in the environment and takes precedence.", key.env);
            }
            Ok(())
        }
        ConfigCommands::Show => show_config(db),
        ConfigCommands::Unset { key } => {
            let key = find_key(&key)?;
            if db.delete_setting(key.setting)? {
                println!("Removed {}", key.setting);
            } else {
                println!("{} was not set", key.setting);
            }
            Ok(())
        }
    }
}

fn show_config(db: &Database) -> Result<()> {
    println!("Configuration");
    println!("─────────────");
    println!("  {:<28} {}", "database", db.path().map(|p| p.display().to_string()).unwrap_or_else(|| "(memory)".to_string()));

    for key in ALL_KEYS {
        let from_env = env::var(key.env).is_ok_and(|v| !v.trim().is_empty());
        let line = match config::resolve(db, key)? {
            Some(value) => {
                let origin = if from_env { "env" } else { "db" };
                format!("{} ({})", display_value(key, &value), origin)
            }
            None => "-".to_string(),
        };
        println!("  {:<28} {}", key.setting, line);
    }
    Ok(())
}

fn find_key(name: &str) -> Result<ConfigKey> {
    config::lookup_key(name).ok_or_else(|| {
        let names: Vec<&str> = ALL_KEYS.iter().map(|k| k.setting).collect();
        anyhow!("Unknown key '{}'. Known keys: {}", name, names.join(", "))
    })
}

fn display_value(key: ConfigKey, value: &str) -> String {
    if key.secret {
        config::mask(value)
    } else {
        value.to_string()
    }
}
