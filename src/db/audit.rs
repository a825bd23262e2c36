use sqlx::PgPool;
use tracing::{error, info};

use super::models::LogRow;

pub async fn log_action(
    pool: &PgPool,
    user_id: Option<i64>,
    action: &str,
    description: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO logs (user_id, action, description) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(action)
        .bind(description)
        .execute(pool)
        .await
        .map(|_| ())
}

/// Writes an audit record without failing the surrounding request.
pub async fn record(pool: &PgPool, user_id: i64, action: &str, description: impl AsRef<str>) {
    let description = description.as_ref();
    match log_action(pool, Some(user_id), action, description).await {
        Ok(()) => info!(user_id, action, "audit"),
        Err(err) => error!(?err, user_id, action, "failed to write audit record"),
    }
}

pub async fn fetch_logs(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<LogRow>> {
    sqlx::query_as::<_, LogRow>(
        "SELECT logs.id, logs.user_id, u.fio AS user_fio, logs.action, logs.description, logs.created_at
         FROM logs
         LEFT JOIN users u ON u.id = logs.user_id
         ORDER BY logs.created_at DESC, logs.id DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
