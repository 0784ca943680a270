use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::Week;
use crate::db::repositories::{ProofRepository, WeekRepository};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::workflow::{accounts, progress, submission};
use crate::workflow::submission::ProofFile;

/// GET /api/weeks — the published catalog, in course order.
pub async fn published_weeks(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> AppResult<Json<Vec<Week>>> {
    let weeks = WeekRepository::published(&state.db).await?;
    Ok(Json(weeks))
}

/// POST /api/user/submit-proof — multipart form with `file`, `weekNumber`
/// and an optional `weekTitle` snapshot.
pub async fn submit_proof(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut file: Option<ProofFile> = None;
    let mut week_number: Option<i32> = None;
    let mut week_title = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?
                    .to_vec();
                file = Some(ProofFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "weekNumber" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?;
                week_number = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("weekNumber must be an integer".to_string())
                })?);
            }
            "weekTitle" => {
                week_title = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?;
            }
            _ => {}
        }
    }

    let (file, week_number) = match (file, week_number) {
        (Some(file), Some(week_number)) => (file, week_number),
        _ => {
            return Err(AppError::Validation(
                "file and week number are required".to_string(),
            ))
        }
    };

    let proof = submission::submit(
        &state.db,
        state.storage.as_ref(),
        &principal,
        week_number,
        &week_title,
        file,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "proof": proof,
            "message": "Proof submitted successfully",
        })),
    ))
}

/// GET /api/user/proofs — the caller's own submissions only.
pub async fn my_proofs(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> AppResult<Json<Vec<submission::ProofView>>> {
    let proofs = submission::list_for_user(&state.db, &principal).await?;
    Ok(Json(proofs))
}

/// GET /api/user/progress — per-week flags plus the dashboard counts.
pub async fn my_progress(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> AppResult<Json<progress::ProgressSummary>> {
    let weeks = WeekRepository::published(&state.db).await?;
    let proofs = ProofRepository::by_user(&state.db, principal.id).await?;
    Ok(Json(progress::aggregate(weeks, &proofs)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailRequest {
    #[validate(email)]
    pub new_email: String,
}

/// POST /api/user/update-email — self-service address change.
pub async fn update_email(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<UpdateEmailRequest>,
) -> AppResult<Json<Value>> {
    request.validate()?;
    accounts::change_email(
        state.identity.as_ref(),
        &state.db,
        principal.id,
        &request.new_email,
    )
    .await?;
    Ok(Json(json!({ "success": true })))
}
