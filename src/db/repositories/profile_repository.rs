use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{NewProfile, Profile, Role};
use crate::db::DatabaseError;

pub struct ProfileRepository;

impl ProfileRepository {
    pub async fn upsert(pool: &PgPool, profile: &NewProfile) -> Result<Profile, DatabaseError> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET email = $2, name = $3, role = $4, updated_at = NOW()
            RETURNING id, email, name, role, created_at, updated_at
            "#,
        )
        .bind(profile.id)
        .bind(profile.email.to_lowercase())
        .bind(&profile.name)
        .bind(profile.role)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Profile>, DatabaseError> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, name, role, created_at, updated_at
            FROM profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn non_admins(pool: &PgPool) -> Result<Vec<Profile>, DatabaseError> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, name, role, created_at, updated_at
            FROM profiles
            WHERE role <> 'admin'
            ORDER BY name, email
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn role_of(pool: &PgPool, id: Uuid) -> Result<Option<Role>, DatabaseError> {
        sqlx::query_scalar::<_, Role>("SELECT role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    pub async fn update_email(
        pool: &PgPool,
        id: Uuid,
        email: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE profiles SET email = $1, updated_at = NOW() WHERE id = $2")
            .bind(email.to_lowercase())
            .bind(id)
            .execute(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    pub async fn count(pool: &PgPool) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }
}
