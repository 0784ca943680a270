use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{NewProof, Proof, ProofStatus};
use crate::db::DatabaseError;

pub struct ProofRepository;

impl ProofRepository {
    pub async fn insert(pool: &PgPool, new_proof: &NewProof) -> Result<Proof, DatabaseError> {
        sqlx::query_as::<_, Proof>(
            r#"
            INSERT INTO proofs (user_id, week, module_title, proof_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, week, module_title, proof_url, status, submitted_at
            "#,
        )
        .bind(new_proof.user_id)
        .bind(new_proof.week)
        .bind(&new_proof.module_title)
        .bind(&new_proof.proof_url)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// All submissions across all users, newest first.
    pub async fn all(pool: &PgPool) -> Result<Vec<Proof>, DatabaseError> {
        sqlx::query_as::<_, Proof>(
            r#"
            SELECT id, user_id, week, module_title, proof_url, status, submitted_at
            FROM proofs
            ORDER BY submitted_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Proof>, DatabaseError> {
        sqlx::query_as::<_, Proof>(
            r#"
            SELECT id, user_id, week, module_title, proof_url, status, submitted_at
            FROM proofs
            WHERE user_id = $1
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: ProofStatus,
    ) -> Result<Option<Proof>, DatabaseError> {
        sqlx::query_as::<_, Proof>(
            r#"
            UPDATE proofs
            SET status = $1
            WHERE id = $2
            RETURNING id, user_id, week, module_title, proof_url, status, submitted_at
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn count_by_status(
        pool: &PgPool,
        status: ProofStatus,
    ) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM proofs WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }
}
