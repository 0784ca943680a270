use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::db::models::Role;
use crate::error::AppError;
use crate::providers::Principal;
use crate::workflow::roles;

/// Any authenticated principal, resolved from the bearer token by the
/// identity provider.
pub struct CurrentUser(pub Principal);

/// An authenticated principal whose role resolves to admin. Role
/// resolution happens exactly once here; handlers never re-derive it.
pub struct AdminUser(pub Principal);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("no token provided".to_string()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let principal = state.identity.user_from_token(token).await?;
        Ok(CurrentUser(principal))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;

        let fallback = state.env.app.admin_fallback_email.as_deref();
        let role = roles::role_for(&state.db, &principal, fallback).await;
        if role != Role::Admin {
            return Err(AppError::Authorization("admin role required".to_string()));
        }

        Ok(AdminUser(principal))
    }
}
