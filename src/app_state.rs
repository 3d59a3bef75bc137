//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    db::initialize, identity::IdentityProvider, insight::InsightGenerator,
    listing_cache::ListingCache,
};

/// The state of the REST server.
///
/// Constructed once at process start and cloned into each handler; every
/// clone shares the same connection, collaborators, and cache.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Resolves the caller's identity from the external identity provider.
    pub identity_provider: Arc<dyn IdentityProvider>,

    /// Derives insights from a user's recent records.
    pub insight_generator: Arc<dyn InsightGenerator>,

    /// Caches rendered record listings between submissions.
    pub listing_cache: ListingCache,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        identity_provider: Arc<dyn IdentityProvider>,
        insight_generator: Arc<dyn InsightGenerator>,
    ) -> Result<Self, rusqlite::Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            identity_provider,
            insight_generator,
            listing_cache: ListingCache::new(),
        })
    }
}
