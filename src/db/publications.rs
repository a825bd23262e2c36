use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use crate::{review::ReviewStatus, validation::dedup_ids};

use super::models::{LecturerRow, PublicationRow};

pub(crate) const PUBLICATION_COLUMNS: &str = "id, title, year, journal, source, link, citations, doi, status, review_comment, revision_deadline, reviewer_id, created_at";

/// Bibliographic fields editable by admins and submitting lecturers.
#[derive(Clone, Debug, Default)]
pub struct PublicationFields {
    pub title: String,
    pub year: i32,
    pub journal: String,
    pub source: String,
    pub link: String,
    pub citations: i32,
    pub doi: String,
}

/// Inserts a publication in status `new` and links it to the given lecturers.
pub async fn create_publication(
    pool: &PgPool,
    fields: &PublicationFields,
    lecturer_ids: &[i64],
) -> sqlx::Result<PublicationRow> {
    let mut tx = pool.begin().await?;

    let publication = sqlx::query_as::<_, PublicationRow>(&format!(
        "INSERT INTO publications (title, year, journal, source, link, citations, doi, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {PUBLICATION_COLUMNS}"
    ))
    .bind(&fields.title)
    .bind(fields.year)
    .bind(&fields.journal)
    .bind(&fields.source)
    .bind(&fields.link)
    .bind(fields.citations)
    .bind(&fields.doi)
    .bind(ReviewStatus::New.as_str())
    .fetch_one(&mut *tx)
    .await?;

    insert_links(&mut tx, publication.id, lecturer_ids).await?;

    tx.commit().await?;
    Ok(publication)
}

/// Overwrites the bibliographic fields and replaces the author list.
/// Review fields are left as they are. Returns `None` for an unknown id.
pub async fn update_publication(
    pool: &PgPool,
    publication_id: i64,
    fields: &PublicationFields,
    lecturer_ids: &[i64],
) -> sqlx::Result<Option<PublicationRow>> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, PublicationRow>(&format!(
        "UPDATE publications
         SET title = $2, year = $3, journal = $4, source = $5, link = $6, citations = $7, doi = $8
         WHERE id = $1
         RETURNING {PUBLICATION_COLUMNS}"
    ))
    .bind(publication_id)
    .bind(&fields.title)
    .bind(fields.year)
    .bind(&fields.journal)
    .bind(&fields.source)
    .bind(&fields.link)
    .bind(fields.citations)
    .bind(&fields.doi)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(publication) = updated else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM lecturer_publications WHERE publication_id = $1")
        .bind(publication_id)
        .execute(&mut *tx)
        .await?;
    insert_links(&mut tx, publication_id, lecturer_ids).await?;

    tx.commit().await?;
    Ok(Some(publication))
}

async fn insert_links(
    conn: &mut PgConnection,
    publication_id: i64,
    lecturer_ids: &[i64],
) -> sqlx::Result<()> {
    for lecturer_id in dedup_ids(lecturer_ids) {
        sqlx::query(
            "INSERT INTO lecturer_publications (lecturer_id, publication_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(lecturer_id)
        .bind(publication_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn fetch_publication(
    pool: &PgPool,
    publication_id: i64,
) -> sqlx::Result<Option<PublicationRow>> {
    sqlx::query_as::<_, PublicationRow>(&format!(
        "SELECT {PUBLICATION_COLUMNS} FROM publications WHERE id = $1"
    ))
    .bind(publication_id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_publication_with_lecturers(
    pool: &PgPool,
    publication_id: i64,
) -> sqlx::Result<Option<(PublicationRow, Vec<LecturerRow>)>> {
    let Some(publication) = fetch_publication(pool, publication_id).await? else {
        return Ok(None);
    };
    let lecturers = super::lecturers::fetch_lecturers_for_publication(pool, publication_id).await?;
    Ok(Some((publication, lecturers)))
}

pub async fn fetch_publications(pool: &PgPool) -> sqlx::Result<Vec<PublicationRow>> {
    sqlx::query_as::<_, PublicationRow>(&format!(
        "SELECT {PUBLICATION_COLUMNS} FROM publications ORDER BY year DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_publications_by_lecturer(
    pool: &PgPool,
    lecturer_id: i64,
) -> sqlx::Result<Vec<PublicationRow>> {
    sqlx::query_as::<_, PublicationRow>(
        "SELECT p.id, p.title, p.year, p.journal, p.source, p.link, p.citations, p.doi, p.status,
                p.review_comment, p.revision_deadline, p.reviewer_id, p.created_at
         FROM publications p
         JOIN lecturer_publications lp ON lp.publication_id = p.id
         WHERE lp.lecturer_id = $1
         ORDER BY p.year DESC, p.id DESC",
    )
    .bind(lecturer_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_publications_by_status(
    pool: &PgPool,
    status: ReviewStatus,
) -> sqlx::Result<Vec<PublicationRow>> {
    sqlx::query_as::<_, PublicationRow>(&format!(
        "SELECT {PUBLICATION_COLUMNS} FROM publications WHERE status = $1 ORDER BY created_at, id"
    ))
    .bind(status.as_str())
    .fetch_all(pool)
    .await
}

pub async fn fetch_lecturer_ids(pool: &PgPool, publication_id: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT lecturer_id FROM lecturer_publications WHERE publication_id = $1 ORDER BY lecturer_id",
    )
    .bind(publication_id)
    .fetch_all(pool)
    .await
}

/// Maps publication id to its authors' names, ordered by lecturer id.
pub async fn fetch_author_names(pool: &PgPool) -> sqlx::Result<HashMap<i64, Vec<String>>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT lp.publication_id, l.fio
         FROM lecturer_publications lp
         JOIN lecturers l ON l.id = lp.lecturer_id
         ORDER BY lp.publication_id, l.id",
    )
    .fetch_all(pool)
    .await?;

    let mut authors: HashMap<i64, Vec<String>> = HashMap::new();
    for (publication_id, fio) in rows {
        authors.entry(publication_id).or_default().push(fio);
    }
    Ok(authors)
}

/// Deletes the publication; associations cascade.
pub async fn delete_publication(
    pool: &PgPool,
    publication_id: i64,
) -> sqlx::Result<Option<PublicationRow>> {
    sqlx::query_as::<_, PublicationRow>(&format!(
        "DELETE FROM publications WHERE id = $1 RETURNING {PUBLICATION_COLUMNS}"
    ))
    .bind(publication_id)
    .fetch_optional(pool)
    .await
}
