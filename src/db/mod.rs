pub mod audit;
pub mod content;
pub mod lecturers;
pub mod metrics;
pub mod models;
pub mod publications;
pub mod sessions;
pub mod users;

use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub use models::{
    DepartmentSummaryRow, FaqRow, FeedbackRow, LecturerRow, LogRow, MetricRow, NewsRow,
    PublicationRow, UserRow,
};

/// Tables in drop order, dependents first.
const MANAGED_TABLES: &[&str] = &[
    "sessions",
    "logs",
    "lecturer_publications",
    "metrics",
    "publications",
    "users",
    "lecturers",
    "feedback",
    "news",
    "faq",
    "_sqlx_migrations",
];

pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")
}

/// Drops every portal table and recreates the schema from migrations.
pub async fn reset(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to open reset transaction")?;
    for table in MANAGED_TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to drop table {table}"))?;
    }
    tx.commit().await.context("failed to commit schema reset")?;
    info!(tables = MANAGED_TABLES.len(), "dropped existing tables");

    migrate(pool).await
}

/// True when the error is a Postgres foreign-key violation.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503"))
}

/// True when the error is a Postgres unique violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
