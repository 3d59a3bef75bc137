//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState, endpoints, insight::get_insights_endpoint,
    record::{create_record_endpoint, list_records_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::RECORDS_API,
            post(create_record_endpoint).get(list_records_endpoint),
        )
        .route(endpoints::INSIGHTS_API, get(get_insights_endpoint))
        .with_state(state)
}
