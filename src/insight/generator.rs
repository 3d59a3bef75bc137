//! The generic record shape and insight types exchanged with the insight
//! generator, plus the generator seam itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::record::ExpenseRecord;

/// The fallback category for records stored without one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// An expense record in the generic shape the insight generator expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    /// The ID of the underlying record.
    pub id: i64,
    /// The amount of money spent.
    pub amount: f64,
    /// The expense category, defaulting to [DEFAULT_CATEGORY] when blank.
    pub category: String,
    /// The record's free-text description.
    pub description: String,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl From<&ExpenseRecord> for ExpenseSummary {
    fn from(record: &ExpenseRecord) -> Self {
        let category = if record.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_owned()
        } else {
            record.category.clone()
        };

        Self {
            id: record.id,
            amount: record.amount,
            category,
            description: record.text.clone(),
            date: record.created_at,
        }
    }
}

/// The severity/type tag on an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    /// An informational observation about spending.
    Info,
    /// Something the user may want to act on.
    Warning,
    /// Positive reinforcement of a spending pattern.
    Success,
    /// A suggestion for improving spending habits.
    Tip,
}

/// A derived, non-persisted summary message about spending behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// A stable identifier for the insight within one response.
    pub id: String,
    /// The severity/type tag.
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// A short headline.
    pub title: String,
    /// The body of the insight.
    pub message: String,
    /// A suggested next step for the user.
    pub action: String,
    /// How confident the generator is in this insight, in [0, 1].
    pub confidence: f64,
}

/// The error returned when insight generation fails.
///
/// Callers absorb this error and substitute fallback content; it is never
/// surfaced to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("insight generation failed: {0}")]
pub struct GeneratorError(pub String);

/// Derives insights from a user's recent expense records.
///
/// The production implementation may call out to an external service; the
/// trait is the boundary the rest of the application sees.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Derive an ordered list of insights from `records`.
    async fn generate(&self, records: &[ExpenseSummary]) -> Result<Vec<Insight>, GeneratorError>;
}

/// A self-contained generator that derives simple observations locally.
///
/// Used as the default so the server runs without an external analysis
/// service configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGenerator;

#[async_trait]
impl InsightGenerator for HeuristicGenerator {
    async fn generate(&self, records: &[ExpenseSummary]) -> Result<Vec<Insight>, GeneratorError> {
        if records.is_empty() {
            return Err(GeneratorError("no records to analyse".to_owned()));
        }

        let total: f64 = records.iter().map(|record| record.amount).sum();
        let mut insights = vec![Insight {
            id: "spending-total-1".to_owned(),
            kind: InsightKind::Info,
            title: "Your recent spending".to_owned(),
            message: format!(
                "You recorded {} expense(s) totalling ${total:.2} over the last month.",
                records.len()
            ),
            action: "Review your expenses".to_owned(),
            confidence: 0.9,
        }];

        if let Some((category, category_total)) = top_category(records) {
            let share = category_total / total;

            if share > 0.5 {
                insights.push(Insight {
                    id: "category-concentration-1".to_owned(),
                    kind: InsightKind::Warning,
                    title: format!("Most of your spending is on {category}"),
                    message: format!(
                        "{category} accounts for {:.0}% of your recent spending (${category_total:.2}).",
                        share * 100.0
                    ),
                    action: format!("Set a budget for {category}"),
                    confidence: 0.7,
                });
            } else {
                insights.push(Insight {
                    id: "top-category-1".to_owned(),
                    kind: InsightKind::Tip,
                    title: format!("Top category: {category}"),
                    message: format!(
                        "You spent ${category_total:.2} on {category}, more than any other category."
                    ),
                    action: format!("Review your {category} expenses"),
                    confidence: 0.7,
                });
            }
        }

        Ok(insights)
    }
}

/// Find the category with the largest total spend.
fn top_category(records: &[ExpenseSummary]) -> Option<(String, f64)> {
    let mut totals: std::collections::HashMap<&str, f64> = std::collections::HashMap::new();

    for record in records {
        *totals.entry(record.category.as_str()).or_default() += record.amount;
    }

    totals
        .into_iter()
        .max_by(|(_, left), (_, right)| left.total_cmp(right))
        .map(|(category, total)| (category.to_owned(), total))
}
