//! Defines the core data model and database queries for expense records.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description, macros::time,
};

use crate::Error;

/// The canonical serialization of record dates, millisecond precision in UTC,
/// e.g. `2024-03-15T12:00:00.000Z`.
const CANONICAL_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// An expense submitted by a user.
///
/// Records are immutable once created: nothing in the application updates or
/// deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// The ID of the record.
    pub id: i64,
    /// A text description of what the money was spent on.
    pub text: String,
    /// The amount of money spent.
    pub amount: f64,
    /// The category label for the expense, e.g. "Food", "Transport".
    pub category: String,
    /// The calendar day of the expense, anchored to midday UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// The subject ID of the user that owns this record.
    pub subject_id: String,
    /// When the record was inserted, used for the "recent records" window.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The validated fields for a new expense record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpenseRecord {
    /// A text description of what the money was spent on.
    pub text: String,
    /// The amount of money spent.
    pub amount: f64,
    /// The category label for the expense.
    pub category: String,
    /// The normalized (midday UTC) date of the expense.
    pub date: OffsetDateTime,
    /// The subject ID of the owning user.
    pub subject_id: String,
}

/// Parse a `YYYY-MM-DD` form field into a timestamp at 12:00:00 UTC on that
/// calendar day.
///
/// The midday anchor means later conversions into any civil timezone still
/// land on the submitted calendar day.
///
/// # Errors
///
/// This function will return an [Error::InvalidDateFormat] if `input` is not
/// a valid `YYYY-MM-DD` date.
pub fn normalize_submission_date(input: &str) -> Result<OffsetDateTime, Error> {
    let mut parts = input.trim().splitn(3, '-');

    let year: i32 = parse_date_part(parts.next())?;
    let month: u8 = parse_date_part(parts.next())?;
    let day: u8 = parse_date_part(parts.next())?;

    let month = Month::try_from(month).map_err(|_| Error::InvalidDateFormat)?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| Error::InvalidDateFormat)?;

    Ok(PrimitiveDateTime::new(date, time!(12:00:00)).assume_utc())
}

fn parse_date_part<T: std::str::FromStr>(part: Option<&str>) -> Result<T, Error> {
    part.ok_or(Error::InvalidDateFormat)?
        .parse()
        .map_err(|_| Error::InvalidDateFormat)
}

/// Serialize `date` in the canonical form returned to clients,
/// e.g. `2024-03-15T12:00:00.000Z`.
pub fn canonical_date_string(date: OffsetDateTime) -> String {
    date.to_offset(time::UtcOffset::UTC)
        .format(CANONICAL_DATE_FORMAT)
        .expect("formatting with a constant format description cannot fail")
}

/// Create a new expense record in the database.
///
/// The record's `created_at` is set to the current time; the owning user row
/// must already exist.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if an SQL related error
/// occurred (e.g., the owning user does not exist).
pub fn create_record(
    new_record: NewExpenseRecord,
    connection: &Connection,
) -> Result<ExpenseRecord, Error> {
    let record = connection
        .prepare(
            "INSERT INTO record (text, amount, category, date, subject_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, text, amount, category, date, subject_id, created_at",
        )?
        .query_one(
            (
                &new_record.text,
                new_record.amount,
                &new_record.category,
                new_record.date,
                &new_record.subject_id,
                OffsetDateTime::now_utc(),
            ),
            map_record_row,
        )?;

    Ok(record)
}

/// Retrieve up to `limit` of a user's records created at or after `since`,
/// newest first.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if an SQL related error
/// occurred.
pub fn get_recent_records(
    subject_id: &str,
    since: OffsetDateTime,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ExpenseRecord>, Error> {
    connection
        .prepare(
            "SELECT id, text, amount, category, date, subject_id, created_at
             FROM record
             WHERE subject_id = :subject_id AND created_at >= :since
             ORDER BY created_at DESC
             LIMIT :limit",
        )?
        .query_map(
            rusqlite::named_params! {
                ":subject_id": subject_id,
                ":since": since,
                ":limit": limit,
            },
            map_record_row,
        )?
        .map(|row| row.map_err(|error| error.into()))
        .collect()
}

/// Retrieve all of a user's records, newest first.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if an SQL related error
/// occurred.
pub fn get_records_by_user(
    subject_id: &str,
    connection: &Connection,
) -> Result<Vec<ExpenseRecord>, Error> {
    connection
        .prepare(
            "SELECT id, text, amount, category, date, subject_id, created_at
             FROM record
             WHERE subject_id = :subject_id
             ORDER BY created_at DESC",
        )?
        .query_map(&[(":subject_id", subject_id)], map_record_row)?
        .map(|row| row.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of expense records in the database.
///
/// # Errors
///
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_records(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM record;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the expense record table in the database.
///
/// # Errors
///
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                subject_id TEXT NOT NULL REFERENCES user(subject_id) ON UPDATE CASCADE,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    // Index used by the recent-records window query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_subject_created
         ON record(subject_id, created_at);",
        (),
    )?;

    Ok(())
}

fn map_record_row(row: &Row) -> Result<ExpenseRecord, rusqlite::Error> {
    Ok(ExpenseRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        subject_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}
