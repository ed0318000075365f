mod activity;
mod agent;
mod lead;
mod notification;
mod reminder;

pub use activity::{Activity, ActivityType};
pub use agent::{Agent, AgentRole};
pub use lead::{normalize_email, normalize_phone, Lead, LeadSource, LeadStatus, LEGACY_STATUSES};
pub use notification::Notification;
pub use reminder::Reminder;
