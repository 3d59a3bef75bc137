//! The user directory: creating the user table and reconciling local user
//! rows with the external identity provider.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{Error, UniqueField, identity::Identity};

/// A user of the application.
///
/// Rows are keyed by the identity provider's subject ID; the application
/// never stores credentials of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's row ID in the application database.
    pub id: i64,
    /// The stable subject ID issued by the identity provider.
    pub subject_id: String,
    /// The user's primary email address.
    pub email: String,
    /// The user's display name, if the identity provider supplied one.
    pub name: Option<String>,
    /// A URL to the user's avatar image, if the identity provider supplied one.
    pub avatar_url: Option<String>,
    /// When the local user row was first created.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                subject_id TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                name TEXT,
                avatar_url TEXT,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert a user row for `subject_id`, or refresh the email on the existing
/// row.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UniqueViolation] for [crate::UniqueField::Email] if the email
///   is already bound to a different subject ID (see
///   [reassign_user_by_email] for the repair),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_user(subject_id: &str, email: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "INSERT INTO user (subject_id, email, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(subject_id) DO UPDATE SET email = excluded.email
             RETURNING id, subject_id, email, name, avatar_url, created_at",
        )?
        .query_one(
            (subject_id, email, OffsetDateTime::now_utc()),
            map_user_row,
        )?;

    Ok(user)
}

/// Re-point the user row owning `email` at a new subject ID.
///
/// This is the repair path for the case where an email address is already
/// bound to a different subject ID: the identity provider considers the
/// caller the owner of the address, so the local row follows it.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if no user owns `email`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn reassign_user_by_email(
    email: &str,
    subject_id: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let user = connection
        .prepare(
            "UPDATE user SET subject_id = ?1 WHERE email = ?2
             RETURNING id, subject_id, email, name, avatar_url, created_at",
        )?
        .query_one((subject_id, email), map_user_row)?;

    Ok(user)
}

/// Ensure a user row exists for `identity`, repairing an email conflict if
/// one occurs.
///
/// The happy path is a plain upsert keyed by subject ID. If the upsert fails
/// because the email is already bound to a different subject ID, the existing
/// row is re-pointed at the caller instead; the identity provider is the
/// authority on who owns the address.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if an SQL related error
/// occurred that is not the known email conflict.
pub fn reconcile_user(identity: &Identity, connection: &Connection) -> Result<User, Error> {
    match upsert_user(&identity.subject_id, &identity.email, connection) {
        Ok(user) => Ok(user),
        Err(Error::UniqueViolation(UniqueField::Email)) => {
            tracing::info!(
                "email {} already belongs to another subject ID, re-pointing it to {}",
                identity.email,
                identity.subject_id
            );

            reassign_user_by_email(&identity.email, &identity.subject_id, connection)
        }
        Err(error) => Err(error),
    }
}

/// Get the user with the specified `subject_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if `subject_id` does not belong to a known user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_subject_id(subject_id: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, subject_id, email, name, avatar_url, created_at
             FROM user WHERE subject_id = :subject_id",
        )?
        .query_one(&[(":subject_id", subject_id)], map_user_row)?;

    Ok(user)
}

/// Get the user row for `identity`, creating one with the provider's profile
/// data if this is the caller's first visit.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if an SQL related error
/// occurred.
pub fn get_or_create_user(identity: &Identity, connection: &Connection) -> Result<User, Error> {
    match get_user_by_subject_id(&identity.subject_id, connection) {
        Ok(user) => Ok(user),
        Err(Error::NotFound) => {
            let user = connection
                .prepare(
                    "INSERT INTO user (subject_id, email, name, avatar_url, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id, subject_id, email, name, avatar_url, created_at",
                )?
                .query_one(
                    (
                        &identity.subject_id,
                        &identity.email,
                        &identity.name,
                        &identity.avatar_url,
                        OffsetDateTime::now_utc(),
                    ),
                    map_user_row,
                )?;

            Ok(user)
        }
        Err(error) => Err(error),
    }
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get::<_, i64>(0).map(|count| count as usize)
        })
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}
