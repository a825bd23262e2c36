use sqlx::PgPool;

use super::models::{FaqRow, FeedbackRow, NewsRow};

pub async fn create_feedback(
    pool: &PgPool,
    name: &str,
    email: &str,
    message: &str,
) -> sqlx::Result<i64> {
    sqlx::query_scalar("INSERT INTO feedback (name, email, message) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(email)
        .bind(message)
        .fetch_one(pool)
        .await
}

pub async fn fetch_feedback(pool: &PgPool) -> sqlx::Result<Vec<FeedbackRow>> {
    sqlx::query_as::<_, FeedbackRow>(
        "SELECT id, name, email, message, created_at FROM feedback ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn delete_feedback(pool: &PgPool, feedback_id: i64) -> sqlx::Result<bool> {
    sqlx::query("DELETE FROM feedback WHERE id = $1")
        .bind(feedback_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() > 0)
}

pub async fn create_news(pool: &PgPool, title: &str, content: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar("INSERT INTO news (title, content) VALUES ($1, $2) RETURNING id")
        .bind(title)
        .bind(content)
        .fetch_one(pool)
        .await
}

pub async fn fetch_news(pool: &PgPool) -> sqlx::Result<Vec<NewsRow>> {
    sqlx::query_as::<_, NewsRow>(
        "SELECT id, title, content, created_at FROM news ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_news_item(pool: &PgPool, news_id: i64) -> sqlx::Result<Option<NewsRow>> {
    sqlx::query_as::<_, NewsRow>("SELECT id, title, content, created_at FROM news WHERE id = $1")
        .bind(news_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_news(pool: &PgPool, news_id: i64) -> sqlx::Result<bool> {
    sqlx::query("DELETE FROM news WHERE id = $1")
        .bind(news_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() > 0)
}

pub async fn create_faq(pool: &PgPool, question: &str, answer: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar("INSERT INTO faq (question, answer) VALUES ($1, $2) RETURNING id")
        .bind(question)
        .bind(answer)
        .fetch_one(pool)
        .await
}

pub async fn fetch_faq(pool: &PgPool) -> sqlx::Result<Vec<FaqRow>> {
    sqlx::query_as::<_, FaqRow>("SELECT id, question, answer FROM faq ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn delete_faq(pool: &PgPool, faq_id: i64) -> sqlx::Result<bool> {
    sqlx::query("DELETE FROM faq WHERE id = $1")
        .bind(faq_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() > 0)
}
