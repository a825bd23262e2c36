use sqlx::PgPool;

use super::models::{DepartmentSummaryRow, LecturerRow};

const LECTURER_COLUMNS: &str = "id, fio, position, department, academic_degree, orcid, email";

/// Editable lecturer fields, shared by create and update.
#[derive(Clone, Debug, Default)]
pub struct LecturerFields {
    pub fio: String,
    pub position: String,
    pub department: String,
    pub academic_degree: String,
    pub orcid: String,
    pub email: String,
}

pub async fn create_lecturer(pool: &PgPool, fields: &LecturerFields) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        "INSERT INTO lecturers (fio, position, department, academic_degree, orcid, email)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(&fields.fio)
    .bind(&fields.position)
    .bind(&fields.department)
    .bind(&fields.academic_degree)
    .bind(&fields.orcid)
    .bind(&fields.email)
    .fetch_one(pool)
    .await
}

pub async fn fetch_lecturer(pool: &PgPool, lecturer_id: i64) -> sqlx::Result<Option<LecturerRow>> {
    sqlx::query_as::<_, LecturerRow>(&format!(
        "SELECT {LECTURER_COLUMNS} FROM lecturers WHERE id = $1"
    ))
    .bind(lecturer_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_lecturers(pool: &PgPool) -> sqlx::Result<Vec<LecturerRow>> {
    sqlx::query_as::<_, LecturerRow>(&format!(
        "SELECT {LECTURER_COLUMNS} FROM lecturers ORDER BY fio, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_lecturers_for_publication(
    pool: &PgPool,
    publication_id: i64,
) -> sqlx::Result<Vec<LecturerRow>> {
    sqlx::query_as::<_, LecturerRow>(
        "SELECT l.id, l.fio, l.position, l.department, l.academic_degree, l.orcid, l.email
         FROM lecturers l
         JOIN lecturer_publications lp ON lp.lecturer_id = l.id
         WHERE lp.publication_id = $1
         ORDER BY l.id",
    )
    .bind(publication_id)
    .fetch_all(pool)
    .await
}

pub async fn update_lecturer(
    pool: &PgPool,
    lecturer_id: i64,
    fields: &LecturerFields,
) -> sqlx::Result<bool> {
    sqlx::query(
        "UPDATE lecturers
         SET fio = $2, position = $3, department = $4, academic_degree = $5, orcid = $6, email = $7
         WHERE id = $1",
    )
    .bind(lecturer_id)
    .bind(&fields.fio)
    .bind(&fields.position)
    .bind(&fields.department)
    .bind(&fields.academic_degree)
    .bind(&fields.orcid)
    .bind(&fields.email)
    .execute(pool)
    .await
    .map(|result| result.rows_affected() > 0)
}

/// Deletes the lecturer; associations and metrics cascade.
pub async fn delete_lecturer(pool: &PgPool, lecturer_id: i64) -> sqlx::Result<Option<LecturerRow>> {
    sqlx::query_as::<_, LecturerRow>(&format!(
        "DELETE FROM lecturers WHERE id = $1 RETURNING {LECTURER_COLUMNS}"
    ))
    .bind(lecturer_id)
    .fetch_optional(pool)
    .await
}

/// Per-department totals. A co-authored publication counts once per author.
pub async fn fetch_department_summary(pool: &PgPool) -> sqlx::Result<Vec<DepartmentSummaryRow>> {
    sqlx::query_as::<_, DepartmentSummaryRow>(
        "SELECT l.department,
                COUNT(DISTINCT l.id) AS lecturers,
                COUNT(p.id) AS publications,
                COALESCE(SUM(p.citations), 0)::BIGINT AS citations
         FROM lecturers l
         LEFT JOIN lecturer_publications lp ON lp.lecturer_id = l.id
         LEFT JOIN publications p ON p.id = lp.publication_id
         GROUP BY l.department
         ORDER BY l.department",
    )
    .fetch_all(pool)
    .await
}
