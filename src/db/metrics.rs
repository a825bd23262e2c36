use sqlx::{FromRow, PgPool};

use super::models::MetricRow;

const METRIC_COLUMNS: &str =
    "id, lecturer_id, year, total_publications, total_citations, h_index, rinc, scopus, wos, google_scholar";

/// Yearly counts written for one lecturer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricValues {
    pub total_publications: i32,
    pub total_citations: i32,
    pub h_index: i32,
    pub rinc: i32,
    pub scopus: i32,
    pub wos: i32,
    pub google_scholar: i32,
}

#[derive(Clone, Debug, FromRow)]
pub struct MetricExportRow {
    pub lecturer_fio: String,
    pub department: String,
    pub year: i32,
    pub total_publications: i32,
    pub total_citations: i32,
    pub h_index: i32,
    pub rinc: i32,
    pub scopus: i32,
    pub wos: i32,
    pub google_scholar: i32,
}

/// Inserts or overwrites the snapshot for `(lecturer_id, year)` in one statement.
pub async fn set_metrics(
    pool: &PgPool,
    lecturer_id: i64,
    year: i32,
    values: &MetricValues,
) -> sqlx::Result<MetricRow> {
    sqlx::query_as::<_, MetricRow>(&format!(
        "INSERT INTO metrics
             (lecturer_id, year, total_publications, total_citations, h_index, rinc, scopus, wos, google_scholar)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT ON CONSTRAINT metrics_lecturer_year_key DO UPDATE SET
             total_publications = EXCLUDED.total_publications,
             total_citations = EXCLUDED.total_citations,
             h_index = EXCLUDED.h_index,
             rinc = EXCLUDED.rinc,
             scopus = EXCLUDED.scopus,
             wos = EXCLUDED.wos,
             google_scholar = EXCLUDED.google_scholar
         RETURNING {METRIC_COLUMNS}"
    ))
    .bind(lecturer_id)
    .bind(year)
    .bind(values.total_publications)
    .bind(values.total_citations)
    .bind(values.h_index)
    .bind(values.rinc)
    .bind(values.scopus)
    .bind(values.wos)
    .bind(values.google_scholar)
    .fetch_one(pool)
    .await
}

pub async fn fetch_metrics_by_lecturer(
    pool: &PgPool,
    lecturer_id: i64,
) -> sqlx::Result<Vec<MetricRow>> {
    sqlx::query_as::<_, MetricRow>(&format!(
        "SELECT {METRIC_COLUMNS} FROM metrics WHERE lecturer_id = $1 ORDER BY year DESC"
    ))
    .bind(lecturer_id)
    .fetch_all(pool)
    .await
}

/// Most recent snapshot per lecturer.
pub async fn fetch_latest_metrics(pool: &PgPool) -> sqlx::Result<Vec<MetricRow>> {
    sqlx::query_as::<_, MetricRow>(&format!(
        "SELECT DISTINCT ON (lecturer_id) {METRIC_COLUMNS}
         FROM metrics
         ORDER BY lecturer_id, year DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_metrics_for_export(pool: &PgPool) -> sqlx::Result<Vec<MetricExportRow>> {
    sqlx::query_as::<_, MetricExportRow>(
        "SELECT l.fio AS lecturer_fio, l.department, m.year, m.total_publications,
                m.total_citations, m.h_index, m.rinc, m.scopus, m.wos, m.google_scholar
         FROM metrics m
         JOIN lecturers l ON l.id = m.lecturer_id
         ORDER BY l.fio, m.year DESC",
    )
    .fetch_all(pool)
    .await
}
