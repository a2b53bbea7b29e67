//! Day note and expense handlers
//!
//! Expense mutations move category spending through the budget engine, so a
//! response may reflect an auto-adjusted or overdrawn category on the next
//! categories read. The period reset check runs first so spending always
//! lands in the current period.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{current_user, parse_date_param, read_json, AppError, AppState};
use keeper_core::budget::check_and_reset_budgets;
use keeper_core::models::{DayNote, DayNoteUpdate, Expense, ExpenseUpdate, NewDayNote, NewExpense};

/// Query parameters for listing notes
#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    /// First date to include (YYYY-MM-DD)
    pub from: Option<String>,
    /// Last date to include (YYYY-MM-DD)
    pub to: Option<String>,
}

/// GET /api/notes - List day notes, newest first, after the period reset check
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotesQuery>,
    request: Request,
) -> Result<Json<Vec<DayNote>>, AppError> {
    let current = current_user(&request)?;
    let from = parse_date_param("from", params.from.as_deref())?;
    let to = parse_date_param("to", params.to.as_deref())?;

    check_and_reset_budgets(&state.db, current.id);

    let notes = state.db.list_notes(current.id, from, to)?;

    state.db.log_audit(
        Some(current.id),
        "list",
        Some("day_note"),
        None,
        Some(&format!("from={:?}, to={:?}, count={}", from, to, notes.len())),
    )?;

    Ok(Json(notes))
}

/// POST /api/notes - Create the note for a date (or update its pin)
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<DayNote>), AppError> {
    let current = current_user(&request)?;
    let new: NewDayNote = read_json(request).await?;

    let note = state.db.create_note(current.id, &new)?;

    state.db.log_audit(
        Some(current.id),
        "create",
        Some("day_note"),
        Some(note.id),
        Some(&format!("date={}", note.date)),
    )?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/:id - Change a note's date or pin
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<DayNote>, AppError> {
    let current = current_user(&request)?;
    let update: DayNoteUpdate = read_json(request).await?;

    let note = state.db.update_note(current.id, id, &update)?;

    state.db.log_audit(
        Some(current.id),
        "update",
        Some("day_note"),
        Some(id),
        Some(&format!("date={}, pinned={}", note.date, note.pinned)),
    )?;

    Ok(Json(note))
}

/// DELETE /api/notes/:id - Delete a note, reversing its expenses
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let current = current_user(&request)?;

    check_and_reset_budgets(&state.db, current.id);

    state.db.delete_note(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "delete", Some("day_note"), Some(id), None)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notes/:id/expenses - Add an expense to a note
pub async fn add_expense(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
    request: Request,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let current = current_user(&request)?;
    let new: NewExpense = read_json(request).await?;

    check_and_reset_budgets(&state.db, current.id);

    let expense = state.db.add_expense(current.id, note_id, &new)?;

    state.db.log_audit(
        Some(current.id),
        "create",
        Some("expense"),
        Some(expense.id),
        Some(&format!(
            "note={}, category={}, amount={}",
            note_id, expense.category_id, expense.amount
        )),
    )?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// PUT /api/expenses/:id - Update an expense
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Expense>, AppError> {
    let current = current_user(&request)?;
    let update: ExpenseUpdate = read_json(request).await?;

    check_and_reset_budgets(&state.db, current.id);

    let expense = state.db.update_expense(current.id, id, &update)?;

    state.db.log_audit(
        Some(current.id),
        "update",
        Some("expense"),
        Some(id),
        Some(&format!(
            "note={}, category={}, amount={}",
            expense.note_id, expense.category_id, expense.amount
        )),
    )?;

    Ok(Json(expense))
}

/// DELETE /api/expenses/:id - Delete an expense
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let current = current_user(&request)?;

    check_and_reset_budgets(&state.db, current.id);

    state.db.delete_expense(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "delete", Some("expense"), Some(id), None)?;

    Ok(StatusCode::NO_CONTENT)
}
