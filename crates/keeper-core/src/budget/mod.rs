//! Budget period engine
//!
//! - `period` - reset-date calculation and the reset decision
//! - `rules` - the spend-delta overdraw / auto-adjust rule
//!
//! The persistence-bound operations (resetting a user's categories, applying a
//! spend delta, undoing history) live on [`Database`](crate::db::Database) so
//! they can run inside a single SQLite transaction.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::db::Database;
use crate::models::ResetSummary;

mod period;
mod rules;

pub use period::{current_period_start, next_reset_date, reset_date_for, should_reset, ResetDay};
pub use rules::{apply_spend, reevaluate, Adjustment, SpendOutcome};

/// Run the lazy budget reset check for a user
///
/// Called before every category or notes read and before each expense
/// mutation. Failures are logged and
/// swallowed so a broken reset never blocks a page load.
pub fn check_and_reset_budgets(db: &Database, user_id: i64) -> Option<ResetSummary> {
    check_and_reset_budgets_at(db, user_id, Utc::now())
}

/// [`check_and_reset_budgets`] with an explicit clock
pub fn check_and_reset_budgets_at(
    db: &Database,
    user_id: i64,
    now: DateTime<Utc>,
) -> Option<ResetSummary> {
    match db.reset_budgets_if_due(user_id, now) {
        Ok(Some(summary)) => {
            info!(
                user_id,
                period_start = %summary.period_start,
                categories = summary.categories_reset,
                "Budget period reset performed"
            );
            Some(summary)
        }
        Ok(None) => None,
        Err(e) => {
            error!(user_id, error = %e, "Budget reset check failed");
            None
        }
    }
}
