use sqlx::PgPool;

use crate::roles::Role;

use super::models::UserRow;

const USER_COLUMNS: &str = "id, fio, email, password_hash, role, lecturer_id, created_at";

pub struct NewUser<'a> {
    pub fio: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub lecturer_id: Option<i64>,
}

pub async fn create_user(pool: &PgPool, user: &NewUser<'_>) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        "INSERT INTO users (fio, email, password_hash, role, lecturer_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(user.fio)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(user.lecturer_id)
    .fetch_one(pool)
    .await
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await
}

pub async fn fetch_user(pool: &PgPool, user_id: i64) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_users(pool: &PgPool) -> sqlx::Result<Vec<UserRow>> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY fio, id"))
        .fetch_all(pool)
        .await
}

pub async fn admin_exists(pool: &PgPool) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
        .fetch_one(pool)
        .await
}

/// Returns false when no user has the given id.
pub async fn update_user(
    pool: &PgPool,
    user_id: i64,
    fio: &str,
    email: &str,
    role: Role,
    lecturer_id: Option<i64>,
) -> sqlx::Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE users SET fio = $2, email = $3, role = $4, lecturer_id = $5 WHERE id = $1",
    )
    .bind(user_id)
    .bind(fio)
    .bind(email)
    .bind(role.as_str())
    .bind(lecturer_id)
    .execute(&mut *tx)
    .await?;

    if role == Role::Blocked {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Changes only the role. Blocking also ends every session of the user.
pub async fn set_role(pool: &PgPool, user_id: i64, role: Role) -> sqlx::Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;

    if role == Role::Blocked {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_password(pool: &PgPool, user_id: i64, password_hash: &str) -> sqlx::Result<bool> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() > 0)
}

pub async fn delete_user(pool: &PgPool, user_id: i64) -> sqlx::Result<bool> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() > 0)
}
