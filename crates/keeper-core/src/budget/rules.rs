//! Spend-delta decision rule

use crate::models::CategoryStatus;
use crate::money;

/// An allocation change made by auto-adjust
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub old_amount: f64,
    pub new_amount: f64,
}

/// Category state after a spend delta has been applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendOutcome {
    pub spent_total: f64,
    pub allocated_amount: f64,
    pub status: CategoryStatus,
    pub overdrawn_amount: f64,
    /// Present when the allocation was raised and a history entry is owed
    pub adjustment: Option<Adjustment>,
}

/// Apply a signed spending delta to a category
///
/// Spending never goes below zero. When the new spending exceeds the
/// allocation the category is either auto-adjusted (allocation raised to the
/// spending) or marked overdrawn by the excess.
pub fn apply_spend(allocated: f64, spent: f64, delta: f64, auto_adjust: bool) -> SpendOutcome {
    let sum = money::add(spent, delta);
    let new_spent = if sum <= 0.0 { 0.0 } else { sum };

    if new_spent <= allocated {
        return SpendOutcome {
            spent_total: new_spent,
            allocated_amount: allocated,
            status: CategoryStatus::Healthy,
            overdrawn_amount: 0.0,
            adjustment: None,
        };
    }

    if auto_adjust {
        SpendOutcome {
            spent_total: new_spent,
            allocated_amount: new_spent,
            status: CategoryStatus::Adjusted,
            overdrawn_amount: 0.0,
            adjustment: Some(Adjustment {
                old_amount: allocated,
                new_amount: new_spent,
            }),
        }
    } else {
        SpendOutcome {
            spent_total: new_spent,
            allocated_amount: allocated,
            status: CategoryStatus::Overdrawn,
            overdrawn_amount: money::sub(new_spent, allocated),
            adjustment: None,
        }
    }
}

/// Overdraw check without auto-adjust, used after manual allocation edits
pub fn reevaluate(allocated: f64, spent: f64) -> (CategoryStatus, f64) {
    if spent > allocated {
        (CategoryStatus::Overdrawn, money::sub(spent, allocated))
    } else {
        (CategoryStatus::Healthy, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_allocation_is_healthy() {
        let outcome = apply_spend(100.0, 20.0, 30.0, false);
        assert_eq!(outcome.spent_total, 50.0);
        assert_eq!(outcome.status, CategoryStatus::Healthy);
        assert_eq!(outcome.overdrawn_amount, 0.0);
        assert!(outcome.adjustment.is_none());
    }

    #[test]
    fn test_exactly_at_allocation_is_healthy() {
        let outcome = apply_spend(100.0, 80.0, 20.0, false);
        assert_eq!(outcome.spent_total, 100.0);
        assert_eq!(outcome.status, CategoryStatus::Healthy);
    }

    #[test]
    fn test_overdrawn_without_auto_adjust() {
        let outcome = apply_spend(100.0, 80.0, 30.0, false);
        assert_eq!(outcome.spent_total, 110.0);
        assert_eq!(outcome.allocated_amount, 100.0);
        assert_eq!(outcome.status, CategoryStatus::Overdrawn);
        assert_eq!(outcome.overdrawn_amount, 10.0);
        assert!(outcome.adjustment.is_none());
    }

    #[test]
    fn test_auto_adjust_raises_allocation() {
        let outcome = apply_spend(100.0, 80.0, 30.0, true);
        assert_eq!(outcome.spent_total, 110.0);
        assert_eq!(outcome.allocated_amount, 110.0);
        assert_eq!(outcome.status, CategoryStatus::Adjusted);
        assert_eq!(outcome.overdrawn_amount, 0.0);
        assert_eq!(
            outcome.adjustment,
            Some(Adjustment {
                old_amount: 100.0,
                new_amount: 110.0
            })
        );
    }

    #[test]
    fn test_negative_delta_clamps_to_zero() {
        let outcome = apply_spend(100.0, 25.0, -40.0, false);
        assert_eq!(outcome.spent_total, 0.0);
        assert!(outcome.spent_total.is_sign_positive());
        assert_eq!(outcome.status, CategoryStatus::Healthy);
    }

    #[test]
    fn test_refund_brings_overdrawn_back_to_healthy() {
        let outcome = apply_spend(100.0, 110.0, -15.0, false);
        assert_eq!(outcome.spent_total, 95.0);
        assert_eq!(outcome.status, CategoryStatus::Healthy);
        assert_eq!(outcome.overdrawn_amount, 0.0);
    }

    #[test]
    fn test_rounding_after_each_step() {
        let outcome = apply_spend(0.3, 0.1, 0.2, false);
        assert_eq!(outcome.spent_total, 0.3);
        assert_eq!(outcome.status, CategoryStatus::Healthy);
    }

    #[test]
    fn test_reevaluate() {
        assert_eq!(reevaluate(50.0, 80.0), (CategoryStatus::Overdrawn, 30.0));
        assert_eq!(reevaluate(80.0, 80.0), (CategoryStatus::Healthy, 0.0));
        assert_eq!(reevaluate(100.0, 0.0), (CategoryStatus::Healthy, 0.0));
    }
}
