use anyhow::{bail, Result};
use tracing::info;

use super::display::format_timestamp;
use super::lookup::{resolve_agent, short};
use super::AgentCommands;
use crate::db::Database;
use crate::models::{Agent, AgentRole};
use crate::pipeline::Pipeline;

/// Execute an agent subcommand.
pub fn run_agent(pipeline: &Pipeline, command: AgentCommands) -> Result<()> {
    let db = pipeline.db();
    match command {
        AgentCommands::Add { name, email, role } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("Agent name cannot be empty.");
            }
            let mut agent = Agent::new(name.to_string());
            agent.email = email.filter(|e| !e.trim().is_empty());
            agent.role = AgentRole::parse(&role);
            db.insert_agent(&agent)?;
            info!(agent = %agent.id, role = agent.role.as_str(), "agent added");
            println!("Added {} ({}, {})", agent.name, agent.role.as_str(), short(&agent.id));
            Ok(())
        }
        AgentCommands::List => list_agents(db),
        AgentCommands::Remove { agent } => {
            let agent = resolve_agent(db, &agent)?;
            pipeline.remove_agent(agent.id)?;
            println!("Removed {}", agent.name);
            Ok(())
        }
    }
}

fn list_agents(db: &Database) -> Result<()> {
    let agents = db.list_agents()?;
    if agents.is_empty() {
        println!("No agents.");
        println!("Use 'leadcmd agent add <name>' to create one.");
        return Ok(());
    }

    println!("Agents:");
    println!("───────");
    for agent in &agents {
        let marker = if agent.is_eligible() { "*" } else { " " };
        println!(
            "{} {} | {:<20} | {:<7} | {} | since {}",
            marker,
            short(&agent.id),
            agent.name,
            agent.role.as_str(),
            agent.email.as_deref().unwrap_or("-"),
            format_timestamp(&agent.created_at)
        );
    }
    println!("\n* receives round-robin assignments");
    Ok(())
}
