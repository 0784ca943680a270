use sqlx::PgPool;
use uuid::Uuid;

use crate::db::DatabaseError;

pub struct ProgressRepository;

impl ProgressRepository {
    /// Mark `(user_id, week)` verified. Keyed on the pair so repeated
    /// approvals stay idempotent.
    pub async fn upsert_verified(
        pool: &PgPool,
        user_id: Uuid,
        week: i32,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, week, verified)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id, week)
            DO UPDATE SET verified = TRUE, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(week)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    /// Verified week counts per user, for the admin user listing.
    pub async fn verified_counts(pool: &PgPool) -> Result<Vec<(Uuid, i64)>, DatabaseError> {
        sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT user_id, COUNT(*)
            FROM user_progress
            WHERE verified
            GROUP BY user_id
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}
