//! Storage tests against a real Postgres. They run only when
//! `TEST_DATABASE_URL` is set and use unique names so runs can share a database.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, NaiveDate, Utc};
use research_metrics::{
    AppConfig, AppState, build_router,
    db::{
        self, audit, content,
        lecturers::{self, LecturerFields},
        metrics::{self, MetricValues},
        publications::{self, PublicationFields},
        sessions,
        users::{self, NewUser},
    },
    review::{self, ReviewError, ReviewStatus},
    roles::{Actor, Role},
};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping storage test");
        return None;
    };
    let pool = db::connect(&url).await.expect("connect to test database");
    db::migrate(&pool).await.expect("migrate test database");
    Some(pool)
}

fn unique(label: &str) -> String {
    format!("{label}-{}", Uuid::new_v4().simple())
}

async fn lecturer(pool: &PgPool, fio: &str) -> i64 {
    lecturers::create_lecturer(
        pool,
        &LecturerFields {
            fio: fio.to_string(),
            department: unique("dept"),
            ..LecturerFields::default()
        },
    )
    .await
    .expect("create lecturer")
}

fn paper(title: &str, year: i32) -> PublicationFields {
    PublicationFields {
        title: title.to_string(),
        year,
        journal: "Journal".to_string(),
        source: "Scopus".to_string(),
        citations: 1,
        ..PublicationFields::default()
    }
}

async fn staff_actor(pool: &PgPool) -> Actor {
    let email = format!("{}@university.ru", unique("staff"));
    let user_id = users::create_user(
        pool,
        &NewUser {
            fio: "Reviewer",
            email: &email,
            password_hash: "x",
            role: Role::Staff,
            lecturer_id: None,
        },
    )
    .await
    .expect("create staff user");
    Actor {
        user_id,
        role: Role::Staff,
    }
}

fn values(total_publications: i32, h_index: i32) -> MetricValues {
    MetricValues {
        total_publications,
        total_citations: 10,
        h_index,
        rinc: 1,
        scopus: 2,
        wos: 3,
        google_scholar: 4,
    }
}

#[tokio::test]
async fn new_publication_starts_in_new_and_follows_review_actions() {
    let Some(pool) = test_pool().await else { return };
    let author = lecturer(&pool, &unique("author")).await;
    let created = publications::create_publication(&pool, &paper(&unique("paper"), 2023), &[author])
        .await
        .expect("create publication");
    assert_eq!(created.status(), ReviewStatus::New);
    assert_eq!(created.reviewer_id, None);

    let staff = staff_actor(&pool).await;
    let deadline = NaiveDate::from_ymd_opt(2030, 6, 30).expect("date");

    let revised = review::send_to_revision(&pool, &staff, created.id, Some("add DOI".into()), Some(deadline))
        .await
        .expect("send to revision");
    assert_eq!(revised.status(), ReviewStatus::RevisionRequired);
    assert_eq!(revised.revision_deadline, Some(deadline));
    assert_eq!(revised.review_comment.as_deref(), Some("add DOI"));
    assert_eq!(revised.reviewer_id, Some(staff.user_id));

    let approved = review::approve(&pool, &staff, created.id, None)
        .await
        .expect("approve");
    assert_eq!(approved.status(), ReviewStatus::Approved);
    assert_eq!(approved.revision_deadline, None);
    assert_eq!(approved.review_comment, None);

    let rejected = review::reject(&pool, &staff, created.id, Some("duplicate".into()))
        .await
        .expect("reject");
    assert_eq!(rejected.status(), ReviewStatus::Rejected);
}

#[tokio::test]
async fn editing_publication_keeps_review_status() {
    let Some(pool) = test_pool().await else { return };
    let staff = staff_actor(&pool).await;
    let created = publications::create_publication(&pool, &paper(&unique("paper"), 2022), &[])
        .await
        .expect("create publication");
    review::approve(&pool, &staff, created.id, Some("fine".into()))
        .await
        .expect("approve");

    let updated = publications::update_publication(&pool, created.id, &paper("Renamed", 2021), &[])
        .await
        .expect("update publication")
        .expect("publication exists");
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.status(), ReviewStatus::Approved);
    assert_eq!(updated.review_comment.as_deref(), Some("fine"));
}

#[tokio::test]
async fn review_of_unknown_publication_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let staff = staff_actor(&pool).await;

    let err = review::approve(&pool, &staff, i64::MAX, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound));
}

#[tokio::test]
async fn set_metrics_twice_keeps_single_row_with_latest_values() {
    let Some(pool) = test_pool().await else { return };
    let lecturer_id = lecturer(&pool, &unique("metrics")).await;

    metrics::set_metrics(&pool, lecturer_id, 2023, &values(5, 2))
        .await
        .expect("first upsert");
    let second = metrics::set_metrics(&pool, lecturer_id, 2023, &values(8, 3))
        .await
        .expect("second upsert");

    let rows = metrics::fetch_metrics_by_lecturer(&pool, lecturer_id)
        .await
        .expect("fetch metrics");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, second.id);
    assert_eq!(rows[0].total_publications, 8);
    assert_eq!(rows[0].h_index, 3);
}

#[tokio::test]
async fn set_metrics_for_unknown_lecturer_is_a_foreign_key_error() {
    let Some(pool) = test_pool().await else { return };

    let err = metrics::set_metrics(&pool, i64::MAX, 2023, &values(1, 1))
        .await
        .unwrap_err();
    assert!(db::is_foreign_key_violation(&err));
}

#[tokio::test]
async fn update_publication_replaces_author_list() {
    let Some(pool) = test_pool().await else { return };
    let a = lecturer(&pool, &unique("a")).await;
    let b = lecturer(&pool, &unique("b")).await;
    let c = lecturer(&pool, &unique("c")).await;

    let created = publications::create_publication(&pool, &paper(&unique("paper"), 2020), &[a, b, a])
        .await
        .expect("create publication");
    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(
        publications::fetch_lecturer_ids(&pool, created.id).await.expect("ids"),
        expected
    );

    publications::update_publication(&pool, created.id, &paper("Paper", 2020), &[b, c])
        .await
        .expect("update publication")
        .expect("publication exists");
    let mut expected = vec![b, c];
    expected.sort_unstable();
    assert_eq!(
        publications::fetch_lecturer_ids(&pool, created.id).await.expect("ids"),
        expected
    );

    publications::update_publication(&pool, created.id, &paper("Paper", 2020), &[])
        .await
        .expect("clear authors");
    assert!(
        publications::fetch_lecturer_ids(&pool, created.id)
            .await
            .expect("ids")
            .is_empty()
    );
}

#[tokio::test]
async fn update_of_unknown_publication_returns_none() {
    let Some(pool) = test_pool().await else { return };
    let result = publications::update_publication(&pool, i64::MAX, &paper("Ghost", 2020), &[])
        .await
        .expect("update query");
    assert!(result.is_none());
}

#[tokio::test]
async fn lecturer_profile_lists_publication_and_metrics_after_upsert() {
    let Some(pool) = test_pool().await else { return };
    let fio = format!("A. Ivanov {}", Uuid::new_v4().simple());
    let lecturer_id = lecturer(&pool, &fio).await;
    publications::create_publication(&pool, &paper("Paper X", 2023), &[lecturer_id])
        .await
        .expect("create publication");

    let profile = lecturers::fetch_lecturer(&pool, lecturer_id)
        .await
        .expect("fetch lecturer")
        .expect("lecturer exists");
    assert_eq!(profile.fio, fio);

    let listed = publications::fetch_publications_by_lecturer(&pool, lecturer_id)
        .await
        .expect("publications");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Paper X");
    assert_eq!(listed[0].year, 2023);

    assert!(
        metrics::fetch_metrics_by_lecturer(&pool, lecturer_id)
            .await
            .expect("metrics")
            .is_empty()
    );
    metrics::set_metrics(&pool, lecturer_id, 2023, &values(1, 1))
        .await
        .expect("set metrics");
    assert_eq!(
        metrics::fetch_metrics_by_lecturer(&pool, lecturer_id)
            .await
            .expect("metrics")
            .len(),
        1
    );
}

#[tokio::test]
async fn deleting_lecturer_cascades_to_links_and_metrics() {
    let Some(pool) = test_pool().await else { return };
    let lecturer_id = lecturer(&pool, &unique("gone")).await;
    let created = publications::create_publication(&pool, &paper(&unique("paper"), 2019), &[lecturer_id])
        .await
        .expect("create publication");
    metrics::set_metrics(&pool, lecturer_id, 2019, &values(1, 1))
        .await
        .expect("set metrics");

    let deleted = lecturers::delete_lecturer(&pool, lecturer_id)
        .await
        .expect("delete lecturer");
    assert!(deleted.is_some());

    assert!(
        publications::fetch_lecturer_ids(&pool, created.id)
            .await
            .expect("ids")
            .is_empty()
    );
    assert!(
        metrics::fetch_metrics_by_lecturer(&pool, lecturer_id)
            .await
            .expect("metrics")
            .is_empty()
    );
    assert!(
        publications::fetch_publication(&pool, created.id)
            .await
            .expect("publication")
            .is_some()
    );
}

#[tokio::test]
async fn blocking_user_ends_sessions() {
    let Some(pool) = test_pool().await else { return };
    let email = format!("{}@university.ru", unique("blocked"));
    let user_id = users::create_user(
        &pool,
        &NewUser {
            fio: "To Block",
            email: &email,
            password_hash: "x",
            role: Role::Lecturer,
            lecturer_id: None,
        },
    )
    .await
    .expect("create user");

    let token = Uuid::new_v4();
    sessions::create_session(&pool, token, user_id, Utc::now() + Duration::days(1))
        .await
        .expect("create session");
    assert!(
        sessions::fetch_session_user(&pool, token)
            .await
            .expect("session")
            .is_some()
    );

    assert!(users::set_role(&pool, user_id, Role::Blocked).await.expect("block"));
    assert!(
        sessions::fetch_session_user(&pool, token)
            .await
            .expect("session")
            .is_none()
    );
}

#[tokio::test]
async fn duplicate_email_is_a_unique_violation_regardless_of_case() {
    let Some(pool) = test_pool().await else { return };
    let email = format!("{}@university.ru", unique("dup"));
    let upper = email.to_uppercase();
    let new_user = |email| NewUser {
        fio: "Dup",
        email,
        password_hash: "x",
        role: Role::Staff,
        lecturer_id: None,
    };

    users::create_user(&pool, &new_user(email.as_str())).await.expect("first user");
    let err = users::create_user(&pool, &new_user(upper.as_str())).await.unwrap_err();
    assert!(db::is_unique_violation(&err));
}

#[tokio::test]
async fn rejected_feedback_is_not_persisted() {
    let Some(pool) = test_pool().await else { return };
    let name = unique("visitor");
    let app = build_router(AppState::from_parts(
        pool.clone(),
        AppConfig::with_database_url("postgres://unused"),
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/feedback")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("name={name}&email=&message=")))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = content::fetch_feedback(&pool).await.expect("feedback");
    assert!(stored.iter().all(|row| row.name != name));
}

#[tokio::test]
async fn latest_metrics_pick_the_newest_year_per_lecturer() {
    let Some(pool) = test_pool().await else { return };
    let lecturer_id = lecturer(&pool, &unique("latest")).await;

    metrics::set_metrics(&pool, lecturer_id, 2023, &values(9, 4))
        .await
        .expect("2023 snapshot");
    metrics::set_metrics(&pool, lecturer_id, 2022, &values(5, 2))
        .await
        .expect("2022 snapshot");

    let latest = metrics::fetch_latest_metrics(&pool).await.expect("latest metrics");
    let own: Vec<_> = latest
        .iter()
        .filter(|row| row.lecturer_id == lecturer_id)
        .collect();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].year, 2023);
    assert_eq!(own[0].total_publications, 9);
}

#[tokio::test]
async fn logout_ends_session_and_writes_audit_record() {
    let Some(pool) = test_pool().await else { return };
    let email = format!("{}@university.ru", unique("leaving"));
    let user_id = users::create_user(
        &pool,
        &NewUser {
            fio: "Leaving",
            email: &email,
            password_hash: "x",
            role: Role::Staff,
            lecturer_id: None,
        },
    )
    .await
    .expect("create user");
    let token = Uuid::new_v4();
    sessions::create_session(&pool, token, user_id, Utc::now() + Duration::days(1))
        .await
        .expect("create session");

    let app = build_router(AppState::from_parts(
        pool.clone(),
        AppConfig::with_database_url("postgres://unused"),
    ));
    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::COOKIE, format!("session_token={token}"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(
        sessions::fetch_session_user(&pool, token)
            .await
            .expect("session")
            .is_none()
    );
    let logs = audit::fetch_logs(&pool, 500).await.expect("logs");
    assert!(
        logs.iter()
            .any(|entry| entry.user_id == Some(user_id) && entry.action == "logout")
    );
}
