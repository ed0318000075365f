use anyhow::Result;

use super::display::{print_lead_row, truncate};
use crate::db::Database;
use crate::models::LeadStatus;

/// Show the pipeline board: each stage with its count and newest leads.
pub fn run_board(db: &Database, per_column: usize) -> Result<()> {
    let counts = db.count_leads_by_status()?;

    for status in LeadStatus::ALL {
        let count = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        let header = format!("{} ({})", status.label(), count);
        println!("{}", header);
        println!("{}", "─".repeat(header.chars().count()));

        let leads = db.list_leads_by_status(status)?;
        for lead in leads.iter().take(per_column) {
            print_lead_row(lead);
        }
        if leads.len() > per_column {
            println!("  … {} more", leads.len() - per_column);
        }
        println!();
    }
    Ok(())
}

/// Totals and conversion rate.
pub fn run_stats(db: &Database) -> Result<()> {
    let stats = db.lead_stats()?;

    println!("Pipeline Statistics");
    println!("───────────────────");
    println!("Total leads:      {}", stats.total);
    println!("New:              {}", stats.new_leads);
    println!("Converted:        {}", stats.converted);
    println!("Conversion rate:  {}%", stats.conversion_rate);

    let counts = db.count_leads_by_status()?;
    if stats.total > 0 {
        println!();
        for (status, count) in counts {
            let bar = "█".repeat(bar_width(count, stats.total, 30));
            println!("  {:<11} {:>5}  {}", status.label(), count, truncate(&bar, 30));
        }
    }
    Ok(())
}

fn bar_width(count: u32, total: u32, max: usize) -> usize {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * max as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(0, 0, 30), 0);
        assert_eq!(bar_width(5, 10, 30), 15);
        assert_eq!(bar_width(10, 10, 30), 30);
    }
}
