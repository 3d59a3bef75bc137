//! Derives the insight list for a user's recent spending.

use std::sync::Mutex;

use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    identity::Identity,
    record::get_recent_records,
    user::get_or_create_user,
};

use super::generator::{ExpenseSummary, Insight, InsightGenerator, InsightKind};

/// The most recent records considered for insight generation.
pub const RECENT_RECORD_LIMIT: u32 = 50;

/// How far back the insight window reaches.
pub const RECENT_WINDOW: Duration = Duration::days(30);

/// The single insight shown to users with no records in the window.
pub fn welcome_insight() -> Insight {
    Insight {
        id: "welcome-1".to_owned(),
        kind: InsightKind::Info,
        title: "Welcome to ExpenseTracker AI!".to_owned(),
        message: "Start adding your expenses to get personalized AI insights.".to_owned(),
        action: "Add your first expense".to_owned(),
        confidence: 1.0,
    }
}

/// The single insight shown when insight generation is unavailable.
pub fn unavailable_insight() -> Insight {
    Insight {
        id: "error-1".to_owned(),
        kind: InsightKind::Warning,
        title: "Insights Temporarily Unavailable".to_owned(),
        message: "We're having trouble analyzing your expenses. Please try again.".to_owned(),
        action: "Retry analysis".to_owned(),
        confidence: 0.5,
    }
}

/// Produce the ordered insight list for the caller.
///
/// This function never fails past its own boundary: missing identity, store
/// errors, and generator failures all resolve to the
/// [unavailable_insight] placeholder, and a caller with no recent records
/// gets the [welcome_insight] instead of a generator call. The returned list
/// is never empty.
pub async fn get_insights(
    identity: Option<Identity>,
    db_connection: &Mutex<Connection>,
    generator: &dyn InsightGenerator,
) -> Vec<Insight> {
    let summaries = match load_recent_summaries(identity, db_connection) {
        Ok(summaries) => summaries,
        Err(error) => {
            tracing::error!("could not load records for insights: {error}");
            return vec![unavailable_insight()];
        }
    };

    if summaries.is_empty() {
        return vec![welcome_insight()];
    }

    match generator.generate(&summaries).await {
        Ok(insights) if !insights.is_empty() => insights,
        Ok(_) => {
            tracing::warn!("insight generator returned no insights");
            vec![unavailable_insight()]
        }
        Err(error) => {
            tracing::error!("could not generate insights: {error}");
            vec![unavailable_insight()]
        }
    }
}

/// Load the caller's recent records in the shape the generator expects.
///
/// The database lock is confined to this function so it is released before
/// the generator call suspends.
fn load_recent_summaries(
    identity: Option<Identity>,
    db_connection: &Mutex<Connection>,
) -> Result<Vec<ExpenseSummary>, Error> {
    let identity = identity.ok_or(Error::NotAuthenticated)?;

    let connection = db_connection.lock().map_err(|_| Error::DatabaseLockError)?;

    let user = get_or_create_user(&identity, &connection)?;
    let since = OffsetDateTime::now_utc() - RECENT_WINDOW;
    let records = get_recent_records(&user.subject_id, since, RECENT_RECORD_LIMIT, &connection)?;

    Ok(records.iter().map(ExpenseSummary::from).collect())
}
