use chrono::{DateTime, Local, Utc};

use super::lookup::short;
use crate::models::{Activity, Agent, Lead, Reminder};

/// Print a lead with clean formatting (only non-empty fields)
pub fn print_lead(lead: &Lead, assignee: Option<&Agent>) {
    println!("{}  [{}]\n", lead.name, lead.status.label());

    println!("  ID:          {}", lead.id);
    if let Some(ref email) = lead.email {
        println!("  Email:       {}", email);
    }
    if let Some(ref phone) = lead.phone {
        println!("  Phone:       {}", phone);
    }
    println!("  Source:      {}", lead.source.display_name());
    if let Some(ref campaign) = lead.campaign {
        println!("  Campaign:    {}", campaign);
    }
    match assignee {
        Some(agent) => println!("  Assigned to: {}", agent.name),
        None if lead.assigned_to.is_some() => println!("  Assigned to: (removed agent)"),
        None => println!("  Assigned to: -"),
    }
    if let Some(ref destination) = lead.destination {
        println!("  Destination: {}", destination);
    }
    if let Some(guests) = lead.guests {
        println!("  Guests:      {}", guests);
    }
    if let Some(date) = lead.check_in_date {
        println!("  Check-in:    {}", date.format("%Y-%m-%d"));
    }
    println!("  Created:     {}", format_timestamp(&lead.created_at));

    if let Some(ref notes) = lead.notes {
        println!("\n  {}", truncate(notes, 200));
    }
}

/// One line per lead for list output.
pub fn print_lead_row(lead: &Lead) {
    println!(
        "  {}  {:<24} {:<11} {:<10} {}",
        short(&lead.id),
        truncate(&lead.name, 24),
        lead.status.label(),
        lead.source.as_str(),
        lead.contact_line()
    );
}

pub fn print_activity(activity: &Activity) {
    println!(
        "  {}  {}",
        format_timestamp(&activity.created_at),
        activity.title
    );
    if let Some(ref description) = activity.description {
        println!("                    {}", truncate(description, 70));
    }
}

pub fn print_reminder(reminder: &Reminder, now: DateTime<Utc>) {
    let mark = if reminder.completed {
        "[x]"
    } else if reminder.is_overdue(now) {
        "[!]"
    } else {
        "[ ]"
    };
    println!(
        "  {} {}  due {}  {}",
        mark,
        reminder.id,
        format_timestamp(&reminder.due_date),
        reminder.title
    );
}

/// Local time, minute precision.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate to `max` characters, ending with an ellipsis when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut.trim_end())
    } else {
        text.to_string()
    }
}
