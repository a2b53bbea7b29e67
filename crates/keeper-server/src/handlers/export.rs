//! Encrypted export handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{current_user, read_json, AppError, AppState};
use keeper_core::export::{export_encrypted, EncryptedExport, ExportFormat};

/// Request body for an export
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub passphrase: String,
}

async fn export(
    state: &AppState,
    request: Request,
    format: ExportFormat,
) -> Result<Json<EncryptedExport>, AppError> {
    let current = current_user(&request)?;
    let req: ExportRequest = read_json(request).await?;

    let export = export_encrypted(&state.db, current.id, format, &req.passphrase)?;

    state.db.log_audit(
        Some(current.id),
        "export",
        Some("user_data"),
        Some(current.id),
        Some(&format!("format={}", format.as_str())),
    )?;
    info!(user_id = current.id, format = format.as_str(), "Export created");

    Ok(Json(export))
}

/// POST /api/export/json - Encrypted JSON export of all user data
pub async fn export_json(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<EncryptedExport>, AppError> {
    export(&state, request, ExportFormat::Json).await
}

/// POST /api/export/csv - Encrypted CSV export of all user data
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<EncryptedExport>, AppError> {
    export(&state, request, ExportFormat::Csv).await
}
