pub const SCHEMA_VERSION: i32 = 2;

pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    role TEXT NOT NULL DEFAULT 'agent' CHECK(role IN ('admin', 'manager', 'agent')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    source TEXT NOT NULL DEFAULT 'manual'
        CHECK(source IN ('facebook', 'google', 'manual', 'referral', 'other')),
    campaign TEXT,
    status TEXT NOT NULL DEFAULT 'new'
        CHECK(status IN ('new', 'contacted', 'follow_up', 'interested', 'converted', 'closed')),
    assigned_to TEXT,
    destination TEXT,
    guests INTEGER,
    notes TEXT,
    check_in_date TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (assigned_to) REFERENCES agents(id) ON DELETE RESTRICT
);

-- Append-only audit log
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    lead_id TEXT NOT NULL,
    user_id TEXT,
    activity_type TEXT NOT NULL
        CHECK(activity_type IN ('status_change', 'assignment', 'note', 'email', 'message')),
    title TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    lead_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    due_date TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    lead_id TEXT,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE
);

-- Round-robin cursor: one row, -1 until the first assignment
CREATE TABLE IF NOT EXISTS assignment_cursor (
    id INTEGER PRIMARY KEY CHECK(id = 1),
    position INTEGER NOT NULL DEFAULT -1
);
INSERT OR IGNORE INTO assignment_cursor (id, position) VALUES (1, -1);

CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Intake uniqueness backstop. Manual leads (created_by set) are exempt.
CREATE UNIQUE INDEX IF NOT EXISTS idx_lead_intake_email
    ON leads(email) WHERE created_by IS NULL AND email IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_lead_intake_phone
    ON leads(phone) WHERE created_by IS NULL AND phone IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_lead_email ON leads(email);
CREATE INDEX IF NOT EXISTS idx_lead_phone ON leads(phone);
CREATE INDEX IF NOT EXISTS idx_lead_status ON leads(status);
CREATE INDEX IF NOT EXISTS idx_lead_assigned ON leads(assigned_to);
CREATE INDEX IF NOT EXISTS idx_lead_created ON leads(created_at);
CREATE INDEX IF NOT EXISTS idx_agent_role ON agents(role, created_at);
CREATE INDEX IF NOT EXISTS idx_activity_lead ON activities(lead_id, created_at);
CREATE INDEX IF NOT EXISTS idx_reminder_lead ON reminders(lead_id, due_date);
CREATE INDEX IF NOT EXISTS idx_reminder_due ON reminders(completed, due_date);
CREATE INDEX IF NOT EXISTS idx_notification_user ON notifications(user_id, created_at);
"#;

/// V2 migration: API keys for the intake gateway
pub const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS api_keys (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    key_hash TEXT NOT NULL UNIQUE,
    key_prefix TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    revoked_at TEXT
);
"#;
