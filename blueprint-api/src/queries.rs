//! SQL statements for the `blueprints` table.
//!
//! Metadata is selected as text so the mapper owns JSON decoding, and bound
//! as text then cast so the column keeps its JSONB type.

/// Table and name index. Safe to run on every startup.
pub const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS blueprints (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'
    );

    CREATE INDEX IF NOT EXISTS idx_blueprints_name ON blueprints(name);
";

pub const GET_BY_ID: &str = "
    SELECT id, name, description, created_at, updated_at, metadata::text AS metadata
    FROM blueprints
    WHERE id = $1
";

pub const GET_ALL: &str = "
    SELECT id, name, description, created_at, updated_at, metadata::text AS metadata
    FROM blueprints
    ORDER BY name ASC, id ASC
    LIMIT $1
    OFFSET $2
";

pub const INSERT: &str = "
    INSERT INTO blueprints (id, name, description, created_at, updated_at, metadata)
    VALUES ($1, $2, $3, $4, $5, $6::text::jsonb)
    RETURNING id, name, description, created_at, updated_at, metadata::text AS metadata
";

/// Leaves created_at untouched.
pub const UPDATE: &str = "
    UPDATE blueprints
    SET name = $2, description = $3, updated_at = $4, metadata = $5::text::jsonb
    WHERE id = $1
    RETURNING id, name, description, created_at, updated_at, metadata::text AS metadata
";

pub const DELETE: &str = "
    DELETE FROM blueprints
    WHERE id = $1
";

pub const COUNT: &str = "
    SELECT COUNT(*) FROM blueprints
";

pub const HEALTH_CHECK: &str = "SELECT 1";
