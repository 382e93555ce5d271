//! Per-user record of completed portraits.
//!
//! ```sql
//! CREATE TABLE portraits (
//!     id                  UUID PRIMARY KEY,
//!     user_id             UUID NOT NULL REFERENCES users(id),
//!     mode                TEXT NOT NULL,
//!     job_id              TEXT NOT NULL,
//!     selection           JSONB,
//!     processed_image_url TEXT NOT NULL,
//!     original_image_url  TEXT NOT NULL,
//!     width               INT  NOT NULL,
//!     height              INT  NOT NULL,
//!     created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::portrait::PortraitRow;
use crate::portrait::pipeline::PortraitResult;
use crate::portrait::selection::FeatureSelection;

/// Newest first, capped.
pub const HISTORY_LIMIT: i64 = 50;

pub async fn record_portrait(
    pool: &PgPool,
    user_id: Uuid,
    selection: Option<&FeatureSelection>,
    result: &PortraitResult,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let selection = selection.map(serde_json::to_value).transpose()?;

    sqlx::query(
        "INSERT INTO portraits
            (id, user_id, mode, job_id, selection, processed_image_url, original_image_url, width, height)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(user_id)
    .bind(result.mode.id())
    .bind(&result.job_id)
    .bind(selection)
    .bind(&result.processed_image_url)
    .bind(&result.original_image_url)
    .bind(result.width as i32)
    .bind(result.height as i32)
    .execute(pool)
    .await?;

    info!("Recorded portrait {id} for user {user_id}");
    Ok(id)
}

/// Records a run without failing the request: the image is already stored by now.
pub async fn record_portrait_best_effort(
    pool: &PgPool,
    user_id: Uuid,
    selection: Option<&FeatureSelection>,
    result: &PortraitResult,
) {
    if let Err(e) = record_portrait(pool, user_id, selection, result).await {
        warn!(
            user_id = %user_id,
            job_id = %result.job_id,
            "Failed to record portrait history: {e:#}"
        );
    }
}

pub async fn list_portraits(pool: &PgPool, user_id: Uuid) -> Result<Vec<PortraitRow>> {
    let rows = sqlx::query_as::<_, PortraitRow>(
        "SELECT id, mode, job_id, selection, processed_image_url, original_image_url,
                width, height, created_at
         FROM portraits
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
