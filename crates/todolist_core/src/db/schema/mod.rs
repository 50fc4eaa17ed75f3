//! Schema bootstrap for the `todo_items` table.
//!
//! # Invariants
//! - A fresh database (`user_version = 0`) gets the table created; an unversioned
//!   `todo_items` table left behind by something else fails the open.
//! - An older version is dropped and recreated; rows are not carried over.
//! - A newer version is rejected so it is never destroyed by an old binary.

use crate::db::{DbError, DbResult, TABLE_NAME};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

/// Version written to `PRAGMA user_version` once the table exists.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_TABLE_SQL: &str = include_str!("todo_items.sql");

/// Applies the schema for the version this binary ships with.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    apply_schema_version(conn, SCHEMA_VERSION)
}

/// Brings the database to `target` using create-or-reset semantics.
pub fn apply_schema_version(conn: &mut Connection, target: u32) -> DbResult<()> {
    // Write lock up front so concurrent first opens serialize.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = current_user_version(&tx)?;

    if current > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: target,
        });
    }
    if current == target {
        return Ok(());
    }

    if current == 0 {
        info!("event=db_schema module=db status=start action=create version={target}");
    } else {
        warn!(
            "event=db_schema module=db status=start action=reset from_version={current} to_version={target}"
        );
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {TABLE_NAME};"))?;
    }
    tx.execute_batch(CREATE_TABLE_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {target};"))?;
    tx.commit()?;

    info!("event=db_schema module=db status=ok version={target}");
    Ok(())
}

/// Reads the stored schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
