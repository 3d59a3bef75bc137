//! Defines the app level error type and conversions to HTTP responses.
use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// A generic message for errors that should not leak internal detail to the
/// client. The original error is logged server-side instead.
pub const GENERIC_STORE_ERROR_MSG: &str = "An unexpected database error occurred.";

/// The column whose UNIQUE constraint was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    /// The identity provider subject ID on the user table.
    SubjectId,
    /// The email address on the user table.
    Email,
}

impl Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::SubjectId => write!(f, "user.subject_id"),
            UniqueField::Email => write!(f, "user.email"),
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more of the form fields required to create an expense record
    /// was left empty or omitted.
    #[error("One or more required fields are missing.")]
    MissingRequiredFields,

    /// The submitted date string could not be parsed as a `YYYY-MM-DD`
    /// calendar date.
    #[error("Invalid date format provided.")]
    InvalidDateFormat,

    /// The submitted amount could not be parsed as a finite number.
    #[error("Amount must be a number.")]
    InvalidAmount,

    /// The request carried no resolvable identity.
    #[error("Authentication failed. User not found.")]
    NotAuthenticated,

    /// A UNIQUE constraint was violated.
    ///
    /// The field tells the caller which constraint fired so the known
    /// conflict cases (e.g., an email already bound to another subject ID)
    /// can be repaired without matching on provider-specific error codes.
    #[error("a UNIQUE constraint on {0} was violated")]
    UniqueViolation(UniqueField),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.contains("user.email") => Error::UniqueViolation(UniqueField::Email),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.contains("user.subject_id") => {
                Error::UniqueViolation(UniqueField::SubjectId)
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::MissingRequiredFields | Error::InvalidDateFormat | Error::InvalidAmount => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Error::NotAuthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_STORE_ERROR_MSG.to_owned(),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::{Error, GENERIC_STORE_ERROR_MSG, UniqueField};

    fn unique_violation_error(desc: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            Some(desc.to_owned()),
        )
    }

    #[test]
    fn email_unique_violation_maps_to_typed_conflict() {
        let error: Error = unique_violation_error("UNIQUE constraint failed: user.email").into();

        assert_eq!(error, Error::UniqueViolation(UniqueField::Email));
    }

    #[test]
    fn subject_id_unique_violation_maps_to_typed_conflict() {
        let error: Error =
            unique_violation_error("UNIQUE constraint failed: user.subject_id").into();

        assert_eq!(error, Error::UniqueViolation(UniqueField::SubjectId));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn validation_errors_report_verbatim_messages() {
        for (error, want) in [
            (
                Error::MissingRequiredFields,
                "One or more required fields are missing.",
            ),
            (Error::InvalidDateFormat, "Invalid date format provided."),
        ] {
            assert_eq!(error.to_string(), want);
        }
    }

    #[tokio::test]
    async fn store_errors_surface_generic_message() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("could not read response body");
        assert_eq!(body, GENERIC_STORE_ERROR_MSG.as_bytes());
    }
}
