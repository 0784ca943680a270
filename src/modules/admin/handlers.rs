use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{NewAccount, NewWeek, ProofStatus, UpdateWeek, Week};
use crate::db::repositories::{
    ProfileRepository, ProgressRepository, ProofRepository, WeekRepository,
};
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::workflow::{accounts, submission};

/// POST /api/admin/accounts
pub async fn create_account(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(new_account): Json<NewAccount>,
) -> AppResult<(StatusCode, Json<accounts::ProvisionedAccount>)> {
    let account = accounts::provision(
        state.identity.as_ref(),
        &state.db,
        state.mailer.as_ref(),
        &state.env.email,
        &new_account,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/admin/proofs
pub async fn list_proofs(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<submission::AdminProofView>>> {
    let proofs = submission::list_for_admin(&state.db).await?;
    Ok(Json(proofs))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyProofRequest {
    pub proof_id: Uuid,
    pub approved: bool,
}

/// POST /api/admin/verify-proof
pub async fn verify_proof(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(request): Json<VerifyProofRequest>,
) -> AppResult<Json<Value>> {
    let outcome = submission::decide(&state.db, request.proof_id, request.approved).await?;

    Ok(Json(json!({
        "success": true,
        "status": outcome.proof.status,
        "progressRecorded": outcome.progress_recorded,
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_users: i64,
    pub accounts_created: i64,
    pub pending_verifications: i64,
    pub verified_modules: i64,
}

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<StatsSummary>> {
    let total_users = ProfileRepository::count(&state.db).await?;
    let pending = ProofRepository::count_by_status(&state.db, ProofStatus::Pending).await?;
    let verified = ProofRepository::count_by_status(&state.db, ProofStatus::Verified).await?;

    Ok(Json(StatsSummary {
        total_users,
        accounts_created: total_users,
        pending_verifications: pending,
        verified_modules: verified,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Verified week count from the derived progress table.
    pub progress: i64,
}

/// GET /api/admin/users — non-admin profiles with their verified counts.
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<UserOverview>>> {
    let profiles = ProfileRepository::non_admins(&state.db).await?;
    let counts: HashMap<Uuid, i64> = ProgressRepository::verified_counts(&state.db)
        .await?
        .into_iter()
        .collect();

    let users = profiles
        .into_iter()
        .map(|profile| UserOverview {
            progress: counts.get(&profile.id).copied().unwrap_or(0),
            id: profile.id,
            name: if profile.name.is_empty() {
                "User".to_string()
            } else {
                profile.name
            },
            email: profile.email,
        })
        .collect();

    Ok(Json(users))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    accounts::remove(state.identity.as_ref(), &state.db, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/weeks — the full catalog, unpublished weeks included.
pub async fn list_weeks(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<Week>>> {
    let weeks = WeekRepository::all(&state.db).await?;
    Ok(Json(weeks))
}

/// POST /api/admin/weeks
pub async fn create_week(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(new_week): Json<NewWeek>,
) -> AppResult<(StatusCode, Json<Week>)> {
    new_week.validate()?;
    let week = WeekRepository::insert(&state.db, &new_week).await?;
    Ok((StatusCode::CREATED, Json(week)))
}

/// PATCH /api/admin/weeks/{id}
pub async fn update_week(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateWeek>,
) -> AppResult<Json<Week>> {
    update.validate()?;
    let week = WeekRepository::update(&state.db, id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("week {id} does not exist")))?;
    Ok(Json(week))
}

/// DELETE /api/admin/weeks/{id}
pub async fn delete_week(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = WeekRepository::delete(&state.db, id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("week {id} does not exist")));
    }
    Ok(Json(json!({ "success": true })))
}
