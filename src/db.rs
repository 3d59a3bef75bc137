//! Creates the database schema for the application.

use rusqlite::Connection;

use crate::{record::create_record_table, user::create_user_table};

/// Initialize the database schema.
///
/// Foreign keys are switched on so a record can never be stored without an
/// owning user row.
///
/// # Errors
///
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    create_user_table(connection)?;
    create_record_table(connection)?;

    Ok(())
}
