//! Defines the endpoint for listing a user's expense records.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    error::GENERIC_STORE_ERROR_MSG,
    identity::IdentityProvider,
    listing_cache::ListingCache,
    record::core::{ExpenseRecord, canonical_date_string, get_records_by_user},
    user::get_or_create_user,
};

/// The state needed to list a user's expense records.
#[derive(Clone)]
pub struct ListRecordsState {
    /// The database connection for reading records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Resolves the caller's identity.
    pub identity_provider: Arc<dyn IdentityProvider>,
    /// Caches the rendered listing between submissions.
    pub listing_cache: ListingCache,
}

impl FromRef<AppState> for ListRecordsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            identity_provider: state.identity_provider.clone(),
            listing_cache: state.listing_cache.clone(),
        }
    }
}

/// One expense record as presented in the listing.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ListedRecord {
    /// The ID of the record.
    pub id: i64,
    /// Text detailing the expense.
    pub text: String,
    /// The amount of money spent.
    pub amount: f64,
    /// The category label for the expense.
    pub category: String,
    /// The normalized expense date, e.g. `2024-03-15T12:00:00.000Z`.
    pub date: String,
}

impl From<&ExpenseRecord> for ListedRecord {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            amount: record.amount,
            category: record.category.clone(),
            date: canonical_date_string(record.date),
        }
    }
}

/// A route handler for listing the caller's expense records, newest first.
///
/// The rendered body is cached per user; submitting a new record invalidates
/// the cache so subsequent reads are fresh.
pub async fn list_records_endpoint(
    State(state): State<ListRecordsState>,
    headers: HeaderMap,
) -> Response {
    let Some(identity) = state.identity_provider.identify(&headers) else {
        return Error::NotAuthenticated.into_response();
    };

    if let Some(cached) = state.listing_cache.get(&identity.subject_id) {
        return json_response(cached);
    }

    let records = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        if let Err(error) = get_or_create_user(&identity, &connection) {
            tracing::error!("could not resolve user {}: {error}", identity.subject_id);
            return error.into_response();
        }

        match get_records_by_user(&identity.subject_id, &connection) {
            Ok(records) => records,
            Err(error) => {
                tracing::error!("could not list records: {error}");
                return error.into_response();
            }
        }
    };

    let listing: Vec<ListedRecord> = records.iter().map(ListedRecord::from).collect();

    let body = match serde_json::to_string(&listing) {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("could not serialize record listing: {error}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_STORE_ERROR_MSG.to_owned(),
            )
                .into_response();
        }
    };

    state.listing_cache.put(&identity.subject_id, body.clone());

    json_response(body)
}

fn json_response(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
