//! Intake gateway: an HTTP endpoint through which ad-platform webhooks and
//! integrations push leads into the pipeline.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod keys;
mod server;
pub mod types;

pub use server::{GatewayServer, Request, Response, KEY_HEADER};

use crate::config::LeadConfig;
use crate::db::api_keys::ApiKey;
use crate::db::Database;

/// Default port for the gateway server.
const DEFAULT_GATEWAY_PORT: u16 = 9820;

#[derive(Args)]
pub struct GatewayArgs {
    #[command(subcommand)]
    pub command: GatewayCommands,
}

#[derive(Subcommand)]
pub enum GatewayCommands {
    /// Start the gateway server in the foreground
    Start {
        /// Port to listen on (default: 9820)
        #[arg(short, long, default_value_t = DEFAULT_GATEWAY_PORT)]
        port: u16,
    },
    /// Show key and lead counts
    Status,
    /// Manage intake API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
}

#[derive(Subcommand)]
pub enum KeysCommands {
    /// Generate a new API key
    Add {
        /// Name for the key (e.g., "Zapier", "Landing page")
        name: String,
    },
    /// List all API keys
    List,
    /// Revoke an API key
    Revoke {
        /// Key ID or prefix to revoke
        id: String,
    },
}

pub fn run_gateway(db: &Database, config: &LeadConfig, args: GatewayArgs) -> Result<()> {
    match args.command {
        GatewayCommands::Start { port } => start_gateway(db, config, port),
        GatewayCommands::Status => show_status(db),
        GatewayCommands::Keys { command } => match command {
            KeysCommands::Add { name } => add_key(db, &name),
            KeysCommands::List => list_keys(db),
            KeysCommands::Revoke { id } => revoke_key(db, &id),
        },
    }
}

fn start_gateway(db: &Database, config: &LeadConfig, port: u16) -> Result<()> {
    let server = GatewayServer::new(port, db, config)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    ctrlc_handler(shutdown.clone());

    if db.list_api_keys()?.iter().all(ApiKey::is_revoked) {
        println!("Warning: no active API keys. Create one with 'leadcmd gateway keys add <name>'.");
    }
    println!("Starting intake gateway on port {}...", port);
    println!("Press Ctrl+C to stop");

    server.start(shutdown)?;
    println!("Gateway stopped");
    Ok(())
}

fn show_status(db: &Database) -> Result<()> {
    println!("Gateway Status");
    println!("──────────────");

    let keys = db.list_api_keys()?;
    let active_keys = keys.iter().filter(|k| !k.is_revoked()).count();
    println!("API Keys:     {} active", active_keys);
    println!("Leads:        {}", db.count_leads()?);

    Ok(())
}

fn add_key(db: &Database, name: &str) -> Result<()> {
    let (full_key, key_hash, key_prefix) = keys::generate_api_key();
    let id = uuid::Uuid::new_v4().to_string();

    db.insert_api_key(&id, name, &key_hash, &key_prefix)?;

    println!("Generated new API key for '{}':\n", name);
    println!("  {}", full_key);
    println!();
    println!("Send it in the X-Intake-Key header. It cannot be recovered.");
    println!("Key ID: {}", &id[..8]);

    Ok(())
}

fn list_keys(db: &Database) -> Result<()> {
    let keys = db.list_api_keys()?;

    if keys.is_empty() {
        println!("No API keys configured.");
        println!("Use 'leadcmd gateway keys add <name>' to create one.");
        return Ok(());
    }

    println!("API Keys:");
    println!("─────────");

    for key in keys {
        let status = if key.is_revoked() { "REVOKED" } else { "active" };
        let last_used = key
            .last_used_at
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {} | {} | {} | last used: {}",
            short_id(&key.id),
            key.key_prefix,
            status,
            last_used
        );
        println!("    Name: {}", key.name);
    }

    Ok(())
}

fn revoke_key(db: &Database, id_or_prefix: &str) -> Result<()> {
    let keys = db.list_api_keys()?;
    let key = find_key_by_prefix(&keys, id_or_prefix)?;

    if key.is_revoked() {
        println!("Key '{}' is already revoked", key.name);
    } else {
        db.revoke_api_key(&key.id)?;
        println!("Revoked key '{}' ({})", key.name, key.key_prefix);
    }

    Ok(())
}

fn find_key_by_prefix<'a>(keys: &'a [ApiKey], id_or_prefix: &str) -> Result<&'a ApiKey> {
    let matching: Vec<_> = keys
        .iter()
        .filter(|k| k.id.starts_with(id_or_prefix) || k.key_prefix.starts_with(id_or_prefix))
        .collect();

    match matching.len() {
        0 => Err(anyhow!("No key found matching '{}'", id_or_prefix)),
        1 => Ok(matching[0]),
        _ => {
            let mut msg = format!("Multiple keys match '{}'. Be more specific:\n", id_or_prefix);
            for key in matching {
                msg.push_str(&format!("  {} | {}\n", short_id(&key.id), key.name));
            }
            Err(anyhow!("{}", msg.trim_end()))
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn ctrlc_handler(shutdown: Arc<AtomicBool>) {
    let _ = ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, shutting down...");
        shutdown.store(true, Ordering::SeqCst);
    });
}
