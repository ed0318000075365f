use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use super::display::print_reminder;
use super::lookup::{require_actor, resolve_lead};
use super::ReminderCommands;
use crate::pipeline::Pipeline;

/// Execute a reminder subcommand.
pub fn run_reminder(pipeline: &Pipeline, actor: Option<&str>, command: ReminderCommands) -> Result<()> {
    let db = pipeline.db();
    match command {
        ReminderCommands::Add {
            lead,
            title,
            due,
            description,
        } => {
            let actor = require_actor(db, actor, "reminder add")?;
            let lead = resolve_lead(db, &lead)?;
            let due = parse_due(&due, Local::now())?;
            let reminder =
                pipeline.create_reminder(lead.id, actor, &title, description.as_deref(), due)?;
            println!("Reminder set for {}: {}", lead.name, reminder.title);
            Ok(())
        }
        ReminderCommands::List { lead } => {
            let lead = resolve_lead(db, &lead)?;
            let reminders = db.list_reminders(lead.id)?;
            if reminders.is_empty() {
                println!("No reminders for {}.", lead.name);
                return Ok(());
            }
            let now = Utc::now();
            for reminder in &reminders {
                print_reminder(reminder, now);
            }
            Ok(())
        }
        ReminderCommands::Toggle { id } => {
            let id = Uuid::parse_str(id.trim()).context("Reminder id must be a full UUID")?;
            let completed = pipeline.toggle_reminder(id)?;
            println!(
                "Reminder marked {}",
                if completed { "done" } else { "not done" }
            );
            Ok(())
        }
        ReminderCommands::Overdue => {
            let now = Utc::now();
            let overdue = db.list_overdue_reminders(now)?;
            if overdue.is_empty() {
                println!("Nothing overdue.");
                return Ok(());
            }
            for reminder in &overdue {
                print_reminder(reminder, now);
            }
            println!("\n{} overdue", overdue.len());
            Ok(())
        }
    }
}

/// Parse a due date typed by a user, in local time.
///
/// Accepts `YYYY-MM-DD` (09:00), `YYYY-MM-DD HH:MM`, or `+N` days from now.
pub fn parse_due(input: &str, now: DateTime<Local>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(days) = input.strip_prefix('+') {
        let days: i64 = days
            .trim_end_matches('d')
            .parse()
            .with_context(|| format!("Invalid day offset '{}'", input))?;
        return Ok((now + Duration::days(days)).with_timezone(&Utc));
    }

    let naive = if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        dt
    } else {
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .ok_or_else(|| {
                anyhow!("Invalid due date '{}': use YYYY-MM-DD, \"YYYY-MM-DD HH:MM\" or +N", input)
            })?
    };

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("'{}' does not exist in the local timezone", input))
}
