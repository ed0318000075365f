use anyhow::{anyhow, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use leadcmd::cli::{
    run_agent, run_board, run_config, run_gateway, run_intake, run_lead, run_notifications,
    run_reminder, run_stats, Cli, Commands,
};
use leadcmd::config::LeadConfig;
use leadcmd::db::Database;
use leadcmd::pipeline::{NotificationRelay, Pipeline};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leadcmd=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::open().context("Failed to open lead database")?;
    let config = LeadConfig::load(&db)?;
    db.set_busy_timeout(config.busy_timeout)?;

    let relay = config
        .notify_webhook
        .as_deref()
        .map(NotificationRelay::new)
        .transpose()
        .map_err(|e| anyhow!("Invalid notification webhook: {}", e))?;
    let pipeline = Pipeline::new(&db).with_relay(relay);
    let actor = cli.actor.as_deref();

    match cli.command {
        Commands::Lead(args) => run_lead(&pipeline, actor, args.command)?,
        Commands::Board(args) => run_board(&db, args.limit)?,
        Commands::Stats => run_stats(&db)?,
        Commands::Agent(args) => run_agent(&pipeline, args.command)?,
        Commands::Reminder(args) => run_reminder(&pipeline, actor, args.command)?,
        Commands::Notifications(args) => run_notifications(&db, &args.agent, args.limit)?,
        Commands::Intake(args) => run_intake(&pipeline, &config, args.command)?,
        Commands::Gateway(args) => run_gateway(&db, &config, args)?,
        Commands::Config(args) => run_config(&db, args.command)?,
    }

    Ok(())
}
