use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// User resolved from a live session token.
#[derive(Clone, Debug, FromRow)]
pub struct SessionUserRow {
    pub id: i64,
    pub fio: String,
    pub email: String,
    pub role: String,
    pub lecturer_id: Option<i64>,
}

pub async fn create_session(
    pool: &PgPool,
    token: Uuid,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn fetch_session_user(pool: &PgPool, token: Uuid) -> sqlx::Result<Option<SessionUserRow>> {
    sqlx::query_as::<_, SessionUserRow>(
        "SELECT users.id, users.fio, users.email, users.role, users.lecturer_id
         FROM sessions JOIN users ON users.id = sessions.user_id
         WHERE sessions.id = $1 AND sessions.expires_at > NOW() AND users.role <> 'blocked'",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn purge_expired(pool: &PgPool) -> sqlx::Result<u64> {
    sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await
        .map(|result| result.rows_affected())
}

pub async fn delete_user_sessions(pool: &PgPool, user_id: i64) -> sqlx::Result<u64> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected())
}
