//! # Database Schema
//!
//! SQL schema for the durable key store.
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │          key_entries            │
//! ├─────────────────────────────────┤
//! │ identifier   TEXT PRIMARY KEY   │
//! │ role         TEXT               │
//! │ material     BLOB (sealed)      │
//! │ created_at   INTEGER (unix ms)  │
//! └─────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Key entries
-- One row per logical identifier; material is AES-256-GCM sealed
CREATE TABLE IF NOT EXISTS key_entries (
    identifier TEXT PRIMARY KEY,
    -- 'encryption_private' or 'signing_public'
    role TEXT NOT NULL,
    -- nonce || ciphertext || tag
    material BLOB NOT NULL,
    -- When this entry was written (Unix timestamp ms)
    created_at INTEGER NOT NULL,
    CONSTRAINT role_known CHECK (role IN ('encryption_private', 'signing_public'))
);
"#;
