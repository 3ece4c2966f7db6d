//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Memories with category labels, metadata, and embeddings",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Beliefs with evidence and tag child tables",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Belief conflicts",
        up: MIGRATION_V3_UP,
    },
    Migration {
        version: 4,
        description: "Belief relationships with metadata and active-edge uniqueness",
        up: MIGRATION_V4_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: memories
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    content TEXT NOT NULL,

    -- Category label
    category_primary TEXT NOT NULL DEFAULT 'general',
    category_secondary TEXT,
    category_tags TEXT NOT NULL DEFAULT '[]',
    category_confidence REAL NOT NULL DEFAULT 0,

    -- Typed metadata
    source TEXT,
    importance REAL,
    confidence REAL,
    tags TEXT NOT NULL DEFAULT '[]',
    access_count INTEGER NOT NULL DEFAULT 0,
    extra TEXT NOT NULL DEFAULT '{}',

    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    relevance_score REAL NOT NULL DEFAULT 0.5,
    version INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_id);
CREATE INDEX IF NOT EXISTS idx_memories_agent_created ON memories(agent_id, created_at);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category_primary);

-- Embeddings storage table (binary blob for efficiency)
CREATE TABLE IF NOT EXISTS memory_embeddings (
    memory_id TEXT PRIMARY KEY REFERENCES memories(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: beliefs
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS beliefs (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    statement TEXT NOT NULL,
    normalized_statement TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT 'general',
    reinforcement_count INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_beliefs_agent ON beliefs(agent_id);
CREATE INDEX IF NOT EXISTS idx_beliefs_agent_active ON beliefs(agent_id, active);
CREATE INDEX IF NOT EXISTS idx_beliefs_category ON beliefs(category);

-- One active belief per normalized statement within an agent
CREATE UNIQUE INDEX IF NOT EXISTS idx_beliefs_unique_active_statement
    ON beliefs(agent_id, normalized_statement) WHERE active = 1;

CREATE TABLE IF NOT EXISTS belief_evidence (
    belief_id TEXT NOT NULL REFERENCES beliefs(id) ON DELETE CASCADE,
    memory_id TEXT NOT NULL,
    PRIMARY KEY (belief_id, memory_id)
);

CREATE TABLE IF NOT EXISTS belief_tags (
    belief_id TEXT NOT NULL REFERENCES beliefs(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (belief_id, tag)
);

INSERT INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// V3: conflicts
const MIGRATION_V3_UP: &str = r#"
CREATE TABLE IF NOT EXISTS belief_conflicts (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    new_evidence_memory_id TEXT,
    description TEXT NOT NULL,
    conflict_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    detected_at TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    resolved_at TEXT,
    resolution_strategy TEXT,
    auto_resolvable INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_conflicts_agent ON belief_conflicts(agent_id);
CREATE INDEX IF NOT EXISTS idx_conflicts_agent_resolved ON belief_conflicts(agent_id, resolved);

CREATE TABLE IF NOT EXISTS conflict_beliefs (
    conflict_id TEXT NOT NULL REFERENCES belief_conflicts(id) ON DELETE CASCADE,
    belief_id TEXT NOT NULL,
    PRIMARY KEY (conflict_id, belief_id)
);

INSERT INTO schema_version (version, applied_at) VALUES (3, datetime('now'));
"#;

/// V4: relationships
const MIGRATION_V4_UP: &str = r#"
CREATE TABLE IF NOT EXISTS belief_relationships (
    id TEXT PRIMARY KEY,
    source_belief_id TEXT NOT NULL,
    target_belief_id TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    relationship_type TEXT NOT NULL,
    strength REAL NOT NULL DEFAULT 0,
    effective_from TEXT,
    effective_until TEXT,
    deprecation_reason TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_relationships_source ON belief_relationships(source_belief_id);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON belief_relationships(target_belief_id);
CREATE INDEX IF NOT EXISTS idx_relationships_agent_type ON belief_relationships(agent_id, relationship_type);
CREATE INDEX IF NOT EXISTS idx_relationships_agent_active ON belief_relationships(agent_id, active);

-- At most one active edge of a type between an ordered pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_relationships_unique_active
    ON belief_relationships(source_belief_id, target_belief_id, relationship_type, agent_id)
    WHERE active = 1;

CREATE TABLE IF NOT EXISTS relationship_metadata (
    relationship_id TEXT NOT NULL REFERENCES belief_relationships(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (relationship_id, key)
);

INSERT INTO schema_version (version, applied_at) VALUES (4, datetime('now'));
"#;

/// FTS5 objects are created separately and best-effort: a backend compiled
/// without FTS5 still opens, it just loses the text strategy.
pub const FTS_SETUP: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id,
    content,
    tags,
    content='memories',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
    INSERT INTO memories_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles multi-statement SQL including indices
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

/// Create FTS5 objects; returns whether the backend supports them
pub fn ensure_fts(conn: &rusqlite::Connection) -> bool {
    match conn.execute_batch(FTS_SETUP) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("FTS5 unavailable, text strategy disabled: {}", e);
            false
        }
    }
}
