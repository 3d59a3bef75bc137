//! Defines the endpoint for retrieving AI insights.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::HeaderMap,
};
use rusqlite::Connection;

use crate::{AppState, identity::IdentityProvider};

use super::{
    core::get_insights,
    generator::{Insight, InsightGenerator},
};

/// The state needed to retrieve insights.
#[derive(Clone)]
pub struct InsightState {
    /// The database connection for reading the caller's records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Resolves the caller's identity.
    pub identity_provider: Arc<dyn IdentityProvider>,
    /// The external insight generator.
    pub insight_generator: Arc<dyn InsightGenerator>,
}

impl FromRef<AppState> for InsightState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            identity_provider: state.identity_provider.clone(),
            insight_generator: state.insight_generator.clone(),
        }
    }
}

/// A route handler for retrieving the caller's insights.
///
/// Always responds 200 with a non-empty insight list; degraded content
/// replaces every failure mode.
pub async fn get_insights_endpoint(
    State(state): State<InsightState>,
    headers: HeaderMap,
) -> Json<Vec<Insight>> {
    let identity = state.identity_provider.identify(&headers);

    let insights = get_insights(
        identity,
        &state.db_connection,
        state.insight_generator.as_ref(),
    )
    .await;

    Json(insights)
}

#[cfg(test)]
mod endpoint_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;

    use crate::{
        endpoints,
        insight::generator::{Insight, InsightKind},
        test_utils::TestStateBuilder,
    };

    use super::get_insights_endpoint;

    fn test_server(state: crate::AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::INSIGHTS_API, get(get_insights_endpoint))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn anonymous_caller_still_gets_an_insight_list() {
        let state = TestStateBuilder::new().anonymous().build();
        let server = test_server(state);

        let response = server.get(endpoints::INSIGHTS_API).await;

        response.assert_status_ok();
        let insights: Vec<Insight> = response.json();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].id, "error-1");
        assert_eq!(insights[0].kind, InsightKind::Warning);
    }

    #[tokio::test]
    async fn generator_failure_still_responds_ok() {
        let state = TestStateBuilder::new()
            .generator(std::sync::Arc::new(crate::test_utils::FailingGenerator))
            .build();
        {
            let connection = state.db_connection.lock().unwrap();
            crate::user::upsert_user(
                crate::test_utils::TEST_SUBJECT_ID,
                crate::test_utils::TEST_EMAIL,
                &connection,
            )
            .unwrap();
            crate::record::create_record(
                crate::record::NewExpenseRecord {
                    text: "Coffee".to_owned(),
                    amount: 4.5,
                    category: "Food".to_owned(),
                    date: time::macros::datetime!(2024-03-15 12:00:00 UTC),
                    subject_id: crate::test_utils::TEST_SUBJECT_ID.to_owned(),
                },
                &connection,
            )
            .unwrap();
        }
        let server = test_server(state);

        let response = server.get(endpoints::INSIGHTS_API).await;

        response.assert_status_ok();
        let insights: Vec<Insight> = response.json();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].id, "error-1");
        assert_eq!(insights[0].confidence, 0.5);
    }

    #[tokio::test]
    async fn new_user_gets_welcome_insight() {
        let state = TestStateBuilder::new().build();
        let server = test_server(state);

        let response = server.get(endpoints::INSIGHTS_API).await;

        response.assert_status_ok();
        let insights: Vec<Insight> = response.json();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].id, "welcome-1");
        assert_eq!(insights[0].confidence, 1.0);
    }
}
