//! Opening SQLite connections and creating the schema.

use std::path::Path;

use decibel_error::{DatabaseError, DatabaseErrorKind};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{info, instrument, warn};

use crate::DatabaseResult;

/// DDL applied to newly created database files.
pub const SCHEMA: &str = include_str!("../schema.sql");

/// Open the database at `path`, creating it with [`SCHEMA`] if the file does
/// not exist yet.
///
/// An existing file is opened as is; no migration is attempted.
///
/// # Errors
///
/// `Connection` if the path is not UTF-8 or SQLite refuses it, `Schema` if a
/// new file cannot be initialized. A half-created file is removed again.
#[instrument(fields(path = %path.display()))]
pub fn open_connection(path: &Path) -> DatabaseResult<SqliteConnection> {
    let url = path.to_str().ok_or_else(|| {
        DatabaseError::new(DatabaseErrorKind::Connection(format!(
            "database path is not valid UTF-8: {}",
            path.display()
        )))
    })?;
    let fresh = !path.exists();

    let mut conn = SqliteConnection::establish(url)?;
    enable_foreign_keys(&mut conn)?;

    if fresh {
        if let Err(e) = apply_schema(&mut conn) {
            drop(conn);
            if let Err(remove_err) = std::fs::remove_file(path) {
                warn!(error = %remove_err, "Could not remove partially initialized database");
            }
            return Err(e);
        }
        info!("Created new database");
    } else {
        info!("Opened existing database");
    }
    Ok(conn)
}

/// Open a private in-memory database with the schema applied.
pub fn open_in_memory() -> DatabaseResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(":memory:")?;
    enable_foreign_keys(&mut conn)?;
    apply_schema(&mut conn)?;
    Ok(conn)
}

fn enable_foreign_keys(conn: &mut SqliteConnection) -> DatabaseResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON;")
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
}

fn apply_schema(conn: &mut SqliteConnection) -> DatabaseResult<()> {
    conn.transaction(|conn| conn.batch_execute(SCHEMA))
        .map_err(|e: diesel::result::Error| {
            DatabaseError::new(DatabaseErrorKind::Schema(e.to_string()))
        })
}
