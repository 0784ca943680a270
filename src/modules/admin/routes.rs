use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    create_account, create_week, delete_user, delete_week, list_proofs, list_users, list_weeks,
    stats, update_week, verify_proof,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/proofs", get(list_proofs))
        .route("/verify-proof", post(verify_proof))
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/weeks", get(list_weeks).post(create_week))
        .route("/weeks/{id}", patch(update_week).delete(delete_week))
}
