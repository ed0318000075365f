use clap::{Args, Parser, Subcommand};

pub mod agent;
pub mod board;
pub mod display;
pub mod gateway;
pub mod intake;
pub mod lead;
pub mod lookup;
pub mod notifications;
pub mod reminder;
pub mod settings;

pub use agent::run_agent;
pub use board::{run_board, run_stats};
pub use gateway::run_gateway;
pub use intake::run_intake;
pub use lead::run_lead;
pub use notifications::run_notifications;
pub use reminder::run_reminder;
pub use settings::run_config;

#[derive(Parser)]
#[command(name = "leadcmd")]
#[command(about = "Lead intake and sales pipeline for the command line")]
#[command(version)]
pub struct Cli {
    /// Agent performing the action (name or id prefix)
    #[arg(long = "as", global = true, value_name = "AGENT")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, inspect and move leads
    Lead(LeadArgs),
    /// Show the pipeline board
    Board(BoardArgs),
    /// Show pipeline statistics
    Stats,
    /// Manage the agent directory
    Agent(AgentArgs),
    /// Follow-up reminders
    Reminder(ReminderArgs),
    /// Show notifications for an agent
    Notifications(NotificationsArgs),
    /// Import or poll leads from external sources
    Intake(IntakeArgs),
    /// HTTP intake gateway
    Gateway(gateway::GatewayArgs),
    /// Show or change configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LeadArgs {
    #[command(subcommand)]
    pub command: LeadCommands,
}

#[derive(Subcommand)]
pub enum LeadCommands {
    /// Enter a lead by hand (requires --as)
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        phone: Option<String>,
        /// facebook, google, manual, referral or other
        #[arg(short, long, default_value = "manual")]
        source: String,
        #[arg(short, long)]
        campaign: Option<String>,
        #[arg(short, long)]
        destination: Option<String>,
        #[arg(short, long)]
        guests: Option<u32>,
        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        check_in: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List leads, newest first
    List {
        /// Case-insensitive match on name or email
        #[arg(short, long)]
        search: Option<String>,
        /// Only leads in this stage
        #[arg(long)]
        status: Option<String>,
        /// Only leads assigned to this agent
        #[arg(short, long)]
        agent: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: u32,
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Show a lead with its activity log and reminders
    Show {
        /// Lead id or id prefix
        lead: String,
    },
    /// Move a lead to another stage
    Status { lead: String, status: String },
    /// Reassign a lead to an agent
    Assign { lead: String, agent: String },
    /// Replace a lead's notes
    Notes { lead: String, notes: String },
    /// Record an email or WhatsApp message sent to the lead
    Log {
        lead: String,
        /// email or whatsapp
        channel: String,
        body: String,
    },
}

#[derive(Args)]
pub struct BoardArgs {
    /// Leads shown per column
    #[arg(short, long, default_value = "5")]
    pub limit: usize,
}

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Add an agent to the directory
    Add {
        name: String,
        #[arg(short, long)]
        email: Option<String>,
        /// admin, manager or agent
        #[arg(short, long, default_value = "agent")]
        role: String,
    },
    /// List agents in assignment order
    List,
    /// Remove an agent
    Remove { agent: String },
}

#[derive(Args)]
pub struct ReminderArgs {
    #[command(subcommand)]
    pub command: ReminderCommands,
}

#[derive(Subcommand)]
pub enum ReminderCommands {
    /// Set a reminder on a lead (requires --as)
    Add {
        lead: String,
        title: String,
        /// Due date: YYYY-MM-DD, "YYYY-MM-DD HH:MM" or +N days
        #[arg(short, long)]
        due: String,
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// List a lead's reminders
    List { lead: String },
    /// Mark a reminder done, or not done
    Toggle {
        /// Reminder id
        id: String,
    },
    /// List all overdue reminders
    Overdue,
}

#[derive(Args)]
pub struct NotificationsArgs {
    /// Agent name or id prefix
    pub agent: String,
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
}

#[derive(Args)]
pub struct IntakeArgs {
    #[command(subcommand)]
    pub command: IntakeCommands,
}

#[derive(Subcommand)]
pub enum IntakeCommands {
    /// Import leads from a CSV file (name,email,phone,campaign)
    Import {
        file: String,
        /// Source tag recorded on the leads
        #[arg(short, long, default_value = "other")]
        source: String,
        /// Validate rows without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Fetch new leads from an ad platform
    Poll {
        /// facebook or google
        source: String,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store a setting in the database
    Set { key: String, value: String },
    /// Show effective configuration
    Show,
    /// Remove a stored setting
    Unset { key: String },
}
