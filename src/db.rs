use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::errors::AppError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/migrations");

/// Open the SQLite database named by `db_url` and bring its schema up to
/// date. SQLite leaves foreign keys off unless asked, and the cascades on
/// `users` and `feeds` depend on them.
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection, AppError> {
    let mut conn = SqliteConnection::establish(db_url)?;
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .map_err(AppError::from)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Connection(format!("failed to run migrations: {e}")))?;
    Ok(conn)
}
