use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::Validate;

/// One unit of the course. `week_number` is any positive integer; the
/// six-week course length is a UI assumption, not a model constraint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Week {
    pub id: Uuid,
    pub week_number: i32,
    pub title: String,
    pub start_date: Option<Date>,
    pub video_url: Option<String>,
    pub module_link: Option<String>,
    pub drive_embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub primary_text: Option<String>,
    pub secondary_text: Option<String>,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewWeek {
    #[validate(range(min = 1))]
    pub week_number: i32,
    #[validate(length(min = 1))]
    pub title: String,
    pub start_date: Option<Date>,
    pub video_url: Option<String>,
    pub module_link: Option<String>,
    pub drive_embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub primary_text: Option<String>,
    pub secondary_text: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWeek {
    #[validate(range(min = 1))]
    pub week_number: Option<i32>,
    pub title: Option<String>,
    pub start_date: Option<Date>,
    pub video_url: Option<String>,
    pub module_link: Option<String>,
    pub drive_embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub primary_text: Option<String>,
    pub secondary_text: Option<String>,
    pub is_published: Option<bool>,
}
