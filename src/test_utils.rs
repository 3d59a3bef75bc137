//! Shared helpers for tests: fixed identities, stub generators, and app
//! state construction with an in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::{
    AppState,
    identity::{Identity, IdentityProvider},
    insight::{
        HeuristicGenerator,
        generator::{ExpenseSummary, GeneratorError, Insight, InsightGenerator, InsightKind},
    },
};

/// The subject ID used by [TestStateBuilder]'s fixed identity.
pub const TEST_SUBJECT_ID: &str = "user_2test";
/// The email used by [TestStateBuilder]'s fixed identity.
pub const TEST_EMAIL: &str = "test@test.com";

/// An identity provider that resolves every request to the same identity.
pub struct FixedIdentityProvider(pub Identity);

impl IdentityProvider for FixedIdentityProvider {
    fn identify(&self, _headers: &HeaderMap) -> Option<Identity> {
        Some(self.0.clone())
    }
}

/// An identity provider that treats every request as unauthenticated.
pub struct AnonymousIdentityProvider;

impl IdentityProvider for AnonymousIdentityProvider {
    fn identify(&self, _headers: &HeaderMap) -> Option<Identity> {
        None
    }
}

/// A generator that returns fixed insights and remembers what it was given.
#[derive(Default)]
pub struct StubGenerator {
    insights: Vec<Insight>,
    seen: Mutex<Vec<ExpenseSummary>>,
}

impl StubGenerator {
    /// A stub that returns a single info insight with the given ID.
    pub fn with_insight(id: &str) -> Self {
        Self {
            insights: vec![Insight {
                id: id.to_owned(),
                kind: InsightKind::Info,
                title: "Stub insight".to_owned(),
                message: "A stubbed observation.".to_owned(),
                action: "None".to_owned(),
                confidence: 0.8,
            }],
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The summaries passed to the most recent `generate` call.
    pub fn seen_records(&self) -> Vec<ExpenseSummary> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsightGenerator for StubGenerator {
    async fn generate(&self, records: &[ExpenseSummary]) -> Result<Vec<Insight>, GeneratorError> {
        *self.seen.lock().unwrap() = records.to_vec();

        Ok(self.insights.clone())
    }
}

/// A generator that always fails.
pub struct FailingGenerator;

#[async_trait]
impl InsightGenerator for FailingGenerator {
    async fn generate(&self, _records: &[ExpenseSummary]) -> Result<Vec<Insight>, GeneratorError> {
        Err(GeneratorError("stub failure".to_owned()))
    }
}

/// Builds an [AppState] backed by an in-memory database.
pub struct TestStateBuilder {
    identity: Option<Identity>,
    generator: Arc<dyn InsightGenerator>,
}

impl TestStateBuilder {
    /// A state whose requests all resolve to the fixed test identity.
    pub fn new() -> Self {
        Self {
            identity: Some(Identity {
                subject_id: TEST_SUBJECT_ID.to_owned(),
                email: TEST_EMAIL.to_owned(),
                name: Some("Test User".to_owned()),
                avatar_url: None,
            }),
            generator: Arc::new(HeuristicGenerator),
        }
    }

    /// Treat every request as unauthenticated.
    pub fn anonymous(mut self) -> Self {
        self.identity = None;
        self
    }

    /// Use `generator` instead of the default heuristic one.
    pub fn generator(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Build the app state.
    pub fn build(self) -> AppState {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");

        let identity_provider: Arc<dyn IdentityProvider> = match self.identity {
            Some(identity) => Arc::new(FixedIdentityProvider(identity)),
            None => Arc::new(AnonymousIdentityProvider),
        };

        AppState::new(conn, identity_provider, self.generator)
            .expect("Could not create test app state")
    }
}
