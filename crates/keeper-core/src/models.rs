//! Domain models for Keeper

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::ResetDay;

/// Default currency for new users
pub const DEFAULT_CURRENCY: &str = "USD";

/// A Keeper user and their budgeting preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// How the account was created (local, seed, ...)
    pub auth_provider: String,
    pub created_at: DateTime<Utc>,
    pub preferences: UserPreferences,
    /// Reset date of the last budget period that was applied (None = never reset)
    pub last_reset_date: Option<DateTime<Utc>>,
}

/// User-configurable preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// ISO 4217 currency code used as the default for new expenses
    pub currency: String,
    pub theme: Theme,
    /// Raise allocations automatically instead of marking categories overdrawn
    pub auto_adjust_budgets: bool,
    /// Day of month on which category spending is zeroed
    pub reset_day: ResetDay,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            theme: Theme::System,
            auto_adjust_budgets: true,
            reset_day: ResetDay::default(),
        }
    }
}

/// Partial update of a user's preferences; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub currency: Option<String>,
    pub theme: Option<Theme>,
    pub auto_adjust_budgets: Option<bool>,
    pub reset_day: Option<ResetDay>,
}

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown theme: {}", s)),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget health of a category within the current period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    /// Spending is within the allocation
    #[default]
    Healthy,
    /// Spending exceeds the allocation and auto-adjust is off
    Overdrawn,
    /// The allocation was raised automatically to absorb an overage
    Adjusted,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Overdrawn => "overdrawn",
            Self::Adjusted => "adjusted",
        }
    }
}

impl std::str::FromStr for CategoryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "overdrawn" => Ok(Self::Overdrawn),
            "adjusted" => Ok(Self::Adjusted),
            _ => Err(format!("Unknown category status: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending category with its allocation for the current period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub allocated_amount: f64,
    /// Spending accumulated since the last reset
    pub spent_total: f64,
    pub status: CategoryStatus,
    /// `spent_total - allocated_amount` while overdrawn, 0 otherwise
    pub overdrawn_amount: f64,
    pub updated_at: DateTime<Utc>,
}

/// A new category to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: String,
    #[serde(default)]
    pub allocated_amount: f64,
}

/// Full replacement of a category's editable fields
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryUpdate {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub allocated_amount: f64,
}

/// Why an allocation history entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryReason {
    /// The user edited the allocation directly
    ManualAdjust,
    /// The allocation was raised to match spending
    AutoAdjust,
    /// Spending was zeroed at the start of a new period
    MonthlyReset,
}

impl HistoryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManualAdjust => "manual-adjust",
            Self::AutoAdjust => "auto-adjust",
            Self::MonthlyReset => "monthly-reset",
        }
    }
}

impl std::str::FromStr for HistoryReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual-adjust" => Ok(Self::ManualAdjust),
            "auto-adjust" => Ok(Self::AutoAdjust),
            "monthly-reset" => Ok(Self::MonthlyReset),
            _ => Err(format!("Unknown history reason: {}", s)),
        }
    }
}

impl std::fmt::Display for HistoryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only record of an allocation or spending change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub category_id: i64,
    pub at: DateTime<Utc>,
    pub old_amount: f64,
    pub new_amount: f64,
    pub reason: HistoryReason,
}

/// Result of applying a budget period reset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetSummary {
    pub user_id: i64,
    /// Reset date of the period that was started
    pub period_start: DateTime<Utc>,
    /// Categories whose spending was zeroed
    pub categories_reset: usize,
    /// History entries written (categories that had spending)
    pub history_entries: usize,
}

/// A day note groups the expenses recorded for one calendar date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayNote {
    pub id: i64,
    pub date: NaiveDate,
    pub total: f64,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<Expense>,
}

/// A day note to create (or re-pin when the date already has one)
#[derive(Debug, Clone, Deserialize)]
pub struct NewDayNote {
    pub date: NaiveDate,
    #[serde(default)]
    pub pinned: bool,
}

/// Partial update of a day note
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayNoteUpdate {
    pub date: Option<NaiveDate>,
    pub pinned: Option<bool>,
}

/// A single expense recorded against a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub note_id: i64,
    pub category_id: i64,
    /// Free-form description such as "Groceries"
    pub label: String,
    pub amount: f64,
    pub currency: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A new expense (before DB insertion)
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub category_id: i64,
    pub label: String,
    pub amount: f64,
    /// Defaults to the user's preferred currency
    pub currency: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of an expense; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdate {
    pub label: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub category_id: Option<i64>,
    /// Move the expense to another note
    pub note_id: Option<i64>,
    pub tags: Option<Vec<String>>,
}

/// A recurring or one-time income source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    /// e.g. "monthly", "weekly", "one-time"
    pub frequency: String,
    pub payday: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new income source
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncomeSource {
    pub name: String,
    pub amount: f64,
    pub frequency: String,
    pub payday: Option<String>,
}

/// Partial update of an income source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomeUpdate {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub frequency: Option<String>,
    pub payday: Option<String>,
}

/// A savings goal with its contributions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: i64,
    pub title: String,
    pub target_amount: f64,
    /// Sum of all contributions
    pub current_saved: f64,
    pub contributions: Vec<SavingsContribution>,
    pub created_at: DateTime<Utc>,
}

/// A new savings goal
#[derive(Debug, Clone, Deserialize)]
pub struct NewSavingsGoal {
    pub title: String,
    #[serde(default)]
    pub target_amount: f64,
}

/// Money put towards a savings goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsContribution {
    pub id: i64,
    pub goal_id: i64,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated spending statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_expenses: f64,
    pub total_income: f64,
    /// total_income - total_expenses
    pub balance: f64,
    pub transaction_count: i64,
    pub average_transaction: f64,
    pub category_breakdown: Vec<CategoryStat>,
    pub monthly: Vec<MonthlyTotal>,
}

/// Spending for one category in a statistics report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub total: f64,
    pub count: i64,
    /// Share of total expenses (0-100)
    pub percentage: f64,
}

/// Spending for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// "YYYY-MM"
    pub month: String,
    pub total: f64,
}
