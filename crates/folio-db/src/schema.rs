//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings and used directly
//! as record keys; enums are stored as lowercase strings guarded by
//! ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "lookup_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: tables
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Resources (folders and documents in one forest)
-- =======================================================================
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD name ON TABLE resource TYPE string;
DEFINE FIELD kind ON TABLE resource TYPE string \
    ASSERT $value IN ['folder', 'document'];
DEFINE FIELD parent_id ON TABLE resource TYPE option<string>;
DEFINE FIELD space ON TABLE resource TYPE string \
    ASSERT $value IN ['public', 'department', 'project'];
DEFINE FIELD owner_id ON TABLE resource TYPE option<string>;
DEFINE FIELD restricted ON TABLE resource TYPE bool DEFAULT false;
DEFINE FIELD public_zone ON TABLE resource TYPE bool DEFAULT false;
DEFINE FIELD department_id ON TABLE resource TYPE option<string>;
DEFINE FIELD project_id ON TABLE resource TYPE option<string>;
DEFINE FIELD revision ON TABLE resource TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Explicit shares (record key derived from resource and user)
-- =======================================================================
DEFINE TABLE share SCHEMAFULL;
DEFINE FIELD resource_id ON TABLE share TYPE string;
DEFINE FIELD user_id ON TABLE share TYPE string;
DEFINE FIELD role ON TABLE share TYPE string \
    ASSERT $value IN ['viewer', 'editor', 'admin'];
DEFINE FIELD created_at ON TABLE share TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE share TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_share_pair ON TABLE share \
    COLUMNS resource_id, user_id UNIQUE;

-- =======================================================================
-- Organisation directory
-- =======================================================================
DEFINE TABLE department SCHEMAFULL;
DEFINE FIELD name ON TABLE department TYPE string;
DEFINE FIELD parent_id ON TABLE department TYPE option<string>;

DEFINE TABLE directory_user SCHEMAFULL;
DEFINE FIELD department_id ON TABLE directory_user TYPE option<string>;
DEFINE FIELD grade ON TABLE directory_user TYPE string \
    DEFAULT 'member' ASSERT $value IN ['member', 'editor', 'manager'];
DEFINE FIELD super_admin ON TABLE directory_user TYPE bool DEFAULT false;

DEFINE TABLE project_member SCHEMAFULL;
DEFINE FIELD project_id ON TABLE project_member TYPE string;
DEFINE FIELD user_id ON TABLE project_member TYPE string;
DEFINE FIELD role ON TABLE project_member TYPE string \
    ASSERT $value IN ['viewer', 'editor', 'admin'];
DEFINE INDEX idx_project_member_pair ON TABLE project_member \
    COLUMNS project_id, user_id UNIQUE;
";

// -----------------------------------------------------------------------
// Schema v2: secondary indexes for the candidate lookups
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX idx_resource_parent ON TABLE resource COLUMNS parent_id;
DEFINE INDEX idx_resource_owner ON TABLE resource COLUMNS owner_id;
DEFINE INDEX idx_resource_department ON TABLE resource \
    COLUMNS department_id;
DEFINE INDEX idx_resource_project ON TABLE resource COLUMNS project_id;
DEFINE INDEX idx_resource_space ON TABLE resource COLUMNS space;
DEFINE INDEX idx_share_user ON TABLE share COLUMNS user_id;
DEFINE INDEX idx_directory_user_department ON TABLE directory_user \
    COLUMNS department_id;
";

/// Bring the database up to the latest schema version.
///
/// Idempotent: the `_migration` table records what has been applied and
/// only newer versions run, so this is called on every startup.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let applied = applied_version(db).await?;
    let pending = pending(applied);
    if pending.is_empty() {
        info!(version = applied, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        apply(db, migration).await?;
    }
    Ok(())
}

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version, name FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map_or(0, |m| m.version))
}

fn pending(applied: u32) -> Vec<&'static Migration> {
    MIGRATIONS.iter().filter(|m| m.version > applied).collect()
}

/// Run one migration and record it in the same transaction.
async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    info!(
        version = migration.version,
        name = migration.name,
        "Applying migration"
    );

    let script = format!(
        "BEGIN TRANSACTION;\n{}\nCREATE _migration SET version = $version, name = $name;\nCOMMIT TRANSACTION;",
        migration.sql
    );
    db.query(script)
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {e}",
                migration.version, migration.name
            ))
        })?;

    info!(version = migration.version, "Migration applied");
    Ok(())
}

/// Returns the raw table DDL of version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_defines_every_table() {
        for table in [
            "resource",
            "share",
            "department",
            "directory_user",
            "project_member",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn pending_skips_applied_versions() {
        assert_eq!(pending(0).len(), MIGRATIONS.len());
        let after_first: Vec<u32> = pending(1).iter().map(|m| m.version).collect();
        assert_eq!(after_first, vec![2]);
        assert!(pending(u32::MAX).is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
