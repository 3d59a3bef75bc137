//! AI insight retrieval for the expense tracking application.
//!
//! This module contains everything related to insights:
//! - The `Insight` model and the generic record shape the generator consumes
//! - The generator seam and the built-in heuristic implementation
//! - The retrieval logic with its welcome/unavailable fallbacks
//! - The HTTP endpoint for fetching a user's insights

mod core;
mod endpoint;
pub mod generator;

pub use core::{RECENT_RECORD_LIMIT, RECENT_WINDOW, get_insights, unavailable_insight, welcome_insight};
pub use endpoint::get_insights_endpoint;
pub use generator::{HeuristicGenerator, Insight, InsightGenerator, InsightKind};
