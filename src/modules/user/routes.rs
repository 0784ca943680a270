use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{my_progress, my_proofs, submit_proof, update_email};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/submit-proof", post(submit_proof))
        .route("/proofs", get(my_proofs))
        .route("/progress", get(my_progress))
        .route("/update-email", post(update_email))
}
