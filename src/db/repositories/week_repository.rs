use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{NewWeek, UpdateWeek, Week};
use crate::db::DatabaseError;

const WEEK_COLUMNS: &str = "id, week_number, title, start_date, video_url, module_link, \
     drive_embed_url, thumbnail_url, primary_text, secondary_text, is_published, \
     created_at, updated_at";

pub struct WeekRepository;

impl WeekRepository {
    pub async fn all(pool: &PgPool) -> Result<Vec<Week>, DatabaseError> {
        sqlx::query_as::<_, Week>(&format!(
            "SELECT {WEEK_COLUMNS} FROM weeks ORDER BY week_number"
        ))
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// The learner-visible catalog.
    pub async fn published(pool: &PgPool) -> Result<Vec<Week>, DatabaseError> {
        sqlx::query_as::<_, Week>(&format!(
            "SELECT {WEEK_COLUMNS} FROM weeks WHERE is_published ORDER BY week_number"
        ))
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn insert(pool: &PgPool, new_week: &NewWeek) -> Result<Week, DatabaseError> {
        sqlx::query_as::<_, Week>(&format!(
            r#"
            INSERT INTO weeks (week_number, title, start_date, video_url, module_link,
                drive_embed_url, thumbnail_url, primary_text, secondary_text, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {WEEK_COLUMNS}
            "#
        ))
        .bind(new_week.week_number)
        .bind(&new_week.title)
        .bind(new_week.start_date)
        .bind(&new_week.video_url)
        .bind(&new_week.module_link)
        .bind(&new_week.drive_embed_url)
        .bind(&new_week.thumbnail_url)
        .bind(&new_week.primary_text)
        .bind(&new_week.secondary_text)
        .bind(new_week.is_published)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        update: &UpdateWeek,
    ) -> Result<Option<Week>, DatabaseError> {
        sqlx::query_as::<_, Week>(&format!(
            r#"
            UPDATE weeks
            SET
                week_number = COALESCE($1, week_number),
                title = COALESCE($2, title),
                start_date = COALESCE($3, start_date),
                video_url = COALESCE($4, video_url),
                module_link = COALESCE($5, module_link),
                drive_embed_url = COALESCE($6, drive_embed_url),
                thumbnail_url = COALESCE($7, thumbnail_url),
                primary_text = COALESCE($8, primary_text),
                secondary_text = COALESCE($9, secondary_text),
                is_published = COALESCE($10, is_published),
                updated_at = NOW()
            WHERE id = $11
            RETURNING {WEEK_COLUMNS}
            "#
        ))
        .bind(update.week_number)
        .bind(&update.title)
        .bind(update.start_date)
        .bind(&update.video_url)
        .bind(&update.module_link)
        .bind(&update.drive_embed_url)
        .bind(&update.thumbnail_url)
        .bind(&update.primary_text)
        .bind(&update.secondary_text)
        .bind(update.is_published)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM weeks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    /// Week-number → title lookup for the listing join.
    pub async fn titles_for(
        pool: &PgPool,
        week_numbers: &[i32],
    ) -> Result<Vec<(i32, String)>, DatabaseError> {
        sqlx::query_as::<_, (i32, String)>(
            "SELECT week_number, title FROM weeks WHERE week_number = ANY($1)",
        )
        .bind(week_numbers)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
