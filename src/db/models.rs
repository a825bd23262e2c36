use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::{review::ReviewStatus, roles::Role};

#[derive(Clone, Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub fio: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub lecturer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> Role {
        Role::from_stored(&self.role)
    }
}

#[derive(Clone, Debug, Default, FromRow)]
pub struct LecturerRow {
    pub id: i64,
    pub fio: String,
    pub position: String,
    pub department: String,
    pub academic_degree: String,
    pub orcid: String,
    pub email: String,
}

#[derive(Clone, Debug, FromRow)]
pub struct PublicationRow {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub journal: String,
    pub source: String,
    pub link: String,
    pub citations: i32,
    pub doi: String,
    pub status: String,
    pub review_comment: Option<String>,
    pub revision_deadline: Option<NaiveDate>,
    pub reviewer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl PublicationRow {
    pub fn status(&self) -> ReviewStatus {
        ReviewStatus::from_stored(&self.status)
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct MetricRow {
    pub id: i64,
    pub lecturer_id: i64,
    pub year: i32,
    pub total_publications: i32,
    pub total_citations: i32,
    pub h_index: i32,
    pub rinc: i32,
    pub scopus: i32,
    pub wos: i32,
    pub google_scholar: i32,
}

#[derive(Clone, Debug, FromRow)]
pub struct LogRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_fio: Option<String>,
    pub action: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, FromRow)]
pub struct FeedbackRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, FromRow)]
pub struct NewsRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, FromRow)]
pub struct FaqRow {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, FromRow)]
pub struct DepartmentSummaryRow {
    pub department: String,
    pub lecturers: i64,
    pub publications: i64,
    pub citations: i64,
}
