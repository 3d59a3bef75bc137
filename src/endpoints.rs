//! The API endpoint URIs.

/// The route to submit (POST) and list (GET) expense records.
pub const RECORDS_API: &str = "/api/records";
/// The route to retrieve the caller's AI insights.
pub const INSIGHTS_API: &str = "/api/insights";
