//! Defines the endpoint for submitting a new expense record.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    identity::IdentityProvider,
    listing_cache::ListingCache,
    record::core::{NewExpenseRecord, canonical_date_string, create_record, normalize_submission_date},
    user::reconcile_user,
};

/// The state needed to create an expense record.
#[derive(Clone)]
pub struct CreateRecordState {
    /// The database connection for managing users and records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Resolves the caller's identity.
    pub identity_provider: Arc<dyn IdentityProvider>,
    /// The cached record listings to invalidate on success.
    pub listing_cache: ListingCache,
}

impl FromRef<AppState> for CreateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            identity_provider: state.identity_provider.clone(),
            listing_cache: state.listing_cache.clone(),
        }
    }
}

/// The form data for submitting an expense record.
///
/// Every field is optional at the type level so the handler can report a
/// missing field as a validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct RecordForm {
    /// Text detailing the expense.
    pub text: Option<String>,
    /// The amount of money spent, as entered in the form.
    pub amount: Option<String>,
    /// The category label for the expense.
    pub category: Option<String>,
    /// The date of the expense in `YYYY-MM-DD` form.
    pub date: Option<String>,
}

/// The fields of a successfully created record, echoed back to the caller.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    /// Text detailing the expense.
    pub text: String,
    /// The amount of money spent.
    pub amount: f64,
    /// The category label for the expense.
    pub category: String,
    /// The normalized date, e.g. `2024-03-15T12:00:00.000Z`.
    pub date: String,
}

/// A route handler for creating a new expense record.
///
/// Validation happens before any I/O; the caller's user row is reconciled
/// with the identity provider before the record is inserted, so a stored
/// record always has an owner.
pub async fn create_record_endpoint(
    State(state): State<CreateRecordState>,
    headers: HeaderMap,
    Form(form): Form<RecordForm>,
) -> Response {
    let (Some(text), Some(amount), Some(category), Some(date)) = (
        non_empty(form.text),
        non_empty(form.amount),
        non_empty(form.category),
        non_empty(form.date),
    ) else {
        return Error::MissingRequiredFields.into_response();
    };

    let amount = match amount.parse::<f64>() {
        Ok(amount) if amount.is_finite() => amount,
        _ => return Error::InvalidAmount.into_response(),
    };

    let date = match normalize_submission_date(&date) {
        Ok(date) => date,
        Err(error) => return error.into_response(),
    };

    let Some(identity) = state.identity_provider.identify(&headers) else {
        return Error::NotAuthenticated.into_response();
    };

    let record = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        if let Err(error) = reconcile_user(&identity, &connection) {
            tracing::error!(
                "could not reconcile user {}: {error}",
                identity.subject_id
            );
            return error.into_response();
        }

        let new_record = NewExpenseRecord {
            text,
            amount,
            category,
            date,
            subject_id: identity.subject_id.clone(),
        };

        match create_record(new_record, &connection) {
            Ok(record) => record,
            Err(error) => {
                tracing::error!("could not create record: {error}");
                return error.into_response();
            }
        }
    };

    state.listing_cache.invalidate(&identity.subject_id);

    (
        StatusCode::CREATED,
        Json(RecordData {
            text: record.text,
            amount: record.amount,
            category: record.category,
            date: canonical_date_string(record.date),
        }),
    )
        .into_response()
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod create_record_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;

    use crate::{
        endpoints,
        record::core::count_records,
        test_utils::{TEST_EMAIL, TEST_SUBJECT_ID, TestStateBuilder},
        user::{count_users, get_user_by_subject_id, upsert_user},
    };

    use super::{RecordData, create_record_endpoint};

    fn test_server(state: &crate::AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::RECORDS_API, post(create_record_endpoint))
            .with_state(state.clone());

        TestServer::new(app).expect("Could not create test server.")
    }

    const VALID_FORM: [(&str, &str); 4] = [
        ("text", "Coffee"),
        ("amount", "4.50"),
        ("category", "Food"),
        ("date", "2024-03-15"),
    ];

    #[tokio::test]
    async fn valid_submission_returns_normalized_record() {
        let state = TestStateBuilder::new().build();
        let server = test_server(&state);

        let response = server.post(endpoints::RECORDS_API).form(&VALID_FORM).await;

        response.assert_status(StatusCode::CREATED);
        let record: RecordData = response.json();
        assert_eq!(
            record,
            RecordData {
                text: "Coffee".to_owned(),
                amount: 4.5,
                category: "Food".to_owned(),
                date: "2024-03-15T12:00:00.000Z".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn valid_submission_creates_user_and_record() {
        let state = TestStateBuilder::new().build();
        let server = test_server(&state);

        server.post(endpoints::RECORDS_API).form(&VALID_FORM).await;

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_users(&connection), Ok(1));
        assert_eq!(count_records(&connection), Ok(1));

        let user = get_user_by_subject_id(TEST_SUBJECT_ID, &connection).unwrap();
        assert_eq!(user.email, TEST_EMAIL);
    }

    #[tokio::test]
    async fn missing_field_is_rejected_without_store_writes() {
        for missing in ["text", "amount", "category", "date"] {
            let state = TestStateBuilder::new().build();
            let server = test_server(&state);
            let form: Vec<(&str, &str)> = VALID_FORM
                .iter()
                .filter(|(name, _)| *name != missing)
                .copied()
                .collect();

            let response = server.post(endpoints::RECORDS_API).form(&form).await;

            response.assert_status(StatusCode::BAD_REQUEST);
            response.assert_text("One or more required fields are missing.");

            let connection = state.db_connection.lock().unwrap();
            assert_eq!(
                count_users(&connection),
                Ok(0),
                "validation must happen before any store writes"
            );
            assert_eq!(count_records(&connection), Ok(0));
        }
    }

    #[tokio::test]
    async fn empty_field_counts_as_missing() {
        let state = TestStateBuilder::new().build();
        let server = test_server(&state);
        let form = [
            ("text", ""),
            ("amount", "4.50"),
            ("category", "Food"),
            ("date", "2024-03-15"),
        ];

        let response = server.post(endpoints::RECORDS_API).form(&form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_amount_is_rejected() {
        for amount in ["abc", "NaN", "inf"] {
            let state = TestStateBuilder::new().build();
            let server = test_server(&state);
            let form = [
                ("text", "Coffee"),
                ("amount", amount),
                ("category", "Food"),
                ("date", "2024-03-15"),
            ];

            let response = server.post(endpoints::RECORDS_API).form(&form).await;

            response.assert_status(StatusCode::BAD_REQUEST);
            response.assert_text("Amount must be a number.");
        }
    }

    #[tokio::test]
    async fn malformed_date_is_rejected() {
        let state = TestStateBuilder::new().build();
        let server = test_server(&state);
        let form = [
            ("text", "Coffee"),
            ("amount", "4.50"),
            ("category", "Food"),
            ("date", "15/03/2024"),
        ];

        let response = server.post(endpoints::RECORDS_API).form(&form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_text("Invalid date format provided.");
    }

    #[tokio::test]
    async fn anonymous_submission_is_rejected() {
        let state = TestStateBuilder::new().anonymous().build();
        let server = test_server(&state);

        let response = server.post(endpoints::RECORDS_API).form(&VALID_FORM).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_text("Authentication failed. User not found.");
    }

    #[tokio::test]
    async fn email_conflict_is_repaired_and_submission_succeeds() {
        let state = TestStateBuilder::new().build();
        {
            let connection = state.db_connection.lock().unwrap();
            upsert_user("user_other", TEST_EMAIL, &connection).unwrap();
        }
        let server = test_server(&state);

        let response = server.post(endpoints::RECORDS_API).form(&VALID_FORM).await;

        response.assert_status(StatusCode::CREATED);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_users(&connection), Ok(1));
        let user = get_user_by_subject_id(TEST_SUBJECT_ID, &connection).unwrap();
        assert_eq!(user.email, TEST_EMAIL);
    }

    #[tokio::test]
    async fn successful_submission_invalidates_cached_listing() {
        let state = TestStateBuilder::new().build();
        state.listing_cache.put(TEST_SUBJECT_ID, "[]".to_owned());
        let server = test_server(&state);

        server.post(endpoints::RECORDS_API).form(&VALID_FORM).await;

        assert_eq!(state.listing_cache.get(TEST_SUBJECT_ID), None);
    }
}
