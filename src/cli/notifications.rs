use anyhow::Result;

use super::display::format_timestamp;
use super::lookup::resolve_agent;
use crate::db::Database;

/// Show an agent's most recent notifications.
pub fn run_notifications(db: &Database, agent: &str, limit: u32) -> Result<()> {
    let agent = resolve_agent(db, agent)?;
    let notifications = db.list_notifications(agent.id, limit)?;

    if notifications.is_empty() {
        println!("No notifications for {}.", agent.name);
        return Ok(());
    }

    println!("Notifications for {}", agent.name);
    println!("─────────────────────");
    for n in &notifications {
        let unread = if n.is_read { " " } else { "*" };
        println!(
            "{} {}  {}: {}",
            unread,
            format_timestamp(&n.created_at),
            n.title,
            n.message
        );
    }
    Ok(())
}
