use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

use super::display::{print_activity, print_lead, print_lead_row, print_reminder};
use super::lookup::{require_actor, resolve_actor, resolve_agent, resolve_lead, short};
use super::LeadCommands;
use crate::db::Database;
use crate::models::{LeadSource, LeadStatus};
use crate::pipeline::{Channel, NewLead, Pipeline};

/// Execute a lead subcommand.
pub fn run_lead(pipeline: &Pipeline, actor: Option<&str>, command: LeadCommands) -> Result<()> {
    let db = pipeline.db();
    match command {
        LeadCommands::Add {
            name,
            email,
            phone,
            source,
            campaign,
            destination,
            guests,
            check_in,
            notes,
        } => {
            let actor = require_actor(db, actor, "lead add")?;
            let check_in_date = check_in
                .as_deref()
                .map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d"))
                .transpose()
                .context("Check-in date must be YYYY-MM-DD")?;

            let lead = pipeline.create_lead(
                NewLead {
                    name,
                    email,
                    phone,
                    source: LeadSource::parse(&source),
                    campaign,
                    destination,
                    guests,
                    check_in_date,
                    notes,
                },
                actor,
            )?;
            println!("Created lead {} ({})", lead.name, short(&lead.id));
            Ok(())
        }
        LeadCommands::List {
            search,
            status,
            agent,
            limit,
            page,
        } => list_leads(db, search.as_deref(), status.as_deref(), agent.as_deref(), limit, page),
        LeadCommands::Show { lead } => show_lead(db, &lead),
        LeadCommands::Status { lead, status } => {
            let lead = resolve_lead(db, &lead)?;
            let actor = resolve_actor(db, actor)?;
            let updated = pipeline.transition(lead.id, &status, actor)?;
            println!(
                "{}: {} -> {}",
                updated.name,
                lead.status.label(),
                updated.status.label()
            );
            Ok(())
        }
        LeadCommands::Assign { lead, agent } => {
            let lead = resolve_lead(db, &lead)?;
            let agent = resolve_agent(db, &agent)?;
            let actor = resolve_actor(db, actor)?;
            pipeline.reassign(lead.id, agent.id, actor)?;
            println!("Assigned {} to {}", lead.name, agent.name);
            Ok(())
        }
        LeadCommands::Notes { lead, notes } => {
            let lead = resolve_lead(db, &lead)?;
            let actor = resolve_actor(db, actor)?;
            pipeline.update_notes(lead.id, &notes, actor)?;
            println!("Notes updated for {}", lead.name);
            Ok(())
        }
        LeadCommands::Log {
            lead,
            channel,
            body,
        } => {
            let lead = resolve_lead(db, &lead)?;
            let channel: Channel = channel.parse()?;
            let actor = resolve_actor(db, actor)?;
            let activity = pipeline.log_communication(lead.id, channel, &body, actor)?;
            println!("{}: {}", activity.title, lead.name);
            Ok(())
        }
    }
}

fn list_leads(
    db: &Database,
    search: Option<&str>,
    status: Option<&str>,
    agent: Option<&str>,
    limit: u32,
    page: u32,
) -> Result<()> {
    let leads = match (status, agent) {
        (Some(status), _) => {
            let status = LeadStatus::parse(status)?;
            db.list_leads_by_status(status)?
        }
        (None, Some(agent)) => {
            let agent = resolve_agent(db, agent)?;
            db.list_leads_assigned_to(agent.id)?
        }
        (None, None) => {
            let offset = page.saturating_sub(1).saturating_mul(limit);
            db.list_leads(search, limit, offset)?
        }
    };

    if leads.is_empty() {
        println!("No leads.");
        return Ok(());
    }

    for lead in &leads {
        print_lead_row(lead);
    }
    println!("\n{} lead(s)", leads.len());
    Ok(())
}

fn show_lead(db: &Database, identifier: &str) -> Result<()> {
    let lead = resolve_lead(db, identifier)?;
    let assignee = match lead.assigned_to {
        Some(id) => db.get_agent(id)?,
        None => None,
    };
    print_lead(&lead, assignee.as_ref());

    let reminders = db.list_reminders(lead.id)?;
    if !reminders.is_empty() {
        println!("\nReminders");
        println!("─────────");
        let now = Utc::now();
        for reminder in &reminders {
            print_reminder(reminder, now);
        }
    }

    let activities = db.list_activities(lead.id)?;
    if !activities.is_empty() {
        println!("\nActivity");
        println!("────────");
        for activity in &activities {
            print_activity(activity);
        }
    }

    Ok(())
}
