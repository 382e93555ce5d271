use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One completed pipeline run, as stored in `portraits`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortraitRow {
    pub id: Uuid,
    pub mode: String,
    pub job_id: String,
    /// Selection summary; absent for background removal.
    pub selection: Option<serde_json::Value>,
    pub processed_image_url: String,
    pub original_image_url: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}
