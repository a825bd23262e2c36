use axum::{
    Json, Router,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde_json::json;

use crate::web::{
    AppState, admin, auth, content, dashboard, feedback, lecturers, publications, reports, review,
    submissions,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/login", get(auth::login_page).post(auth::process_login))
        .route("/logout", post(auth::logout))
        .route("/healthz", get(healthz))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/lecturers", get(lecturers::list_lecturers))
        .route(
            "/lecturers/new",
            get(lecturers::new_lecturer_page).post(lecturers::create_lecturer),
        )
        .route("/lecturers/:id", get(lecturers::lecturer_profile))
        .route(
            "/lecturers/:id/edit",
            get(lecturers::edit_lecturer_page).post(lecturers::update_lecturer),
        )
        .route("/lecturers/:id/delete", post(lecturers::delete_lecturer))
        .route(
            "/lecturers/:id/metrics",
            get(lecturers::metrics_page).post(lecturers::save_metrics),
        )
        .route("/publications", get(publications::list_publications))
        .route(
            "/publications/new",
            get(publications::new_publication_page).post(publications::create_publication),
        )
        .route(
            "/publications/:id/edit",
            get(publications::edit_publication_page).post(publications::update_publication),
        )
        .route(
            "/publications/:id/delete",
            post(publications::delete_publication),
        )
        .route("/publications/:id/approve", post(review::approve))
        .route("/publications/:id/reject", post(review::reject))
        .route("/publications/:id/revision", post(review::send_to_revision))
        .route("/review", get(review::review_queue))
        .route(
            "/my/publications",
            get(submissions::my_publications).post(submissions::submit_publication),
        )
        .route("/reports", get(reports::reports_page))
        .route("/export/publications.csv", get(reports::export_publications_csv))
        .route("/export/metrics.csv", get(reports::export_metrics_csv))
        .route("/export/publications.xlsx", get(reports::export_publications_xlsx))
        .route("/news", get(content::news_list))
        .route("/news/:id", get(content::news_item))
        .route("/faq", get(content::faq_page))
        .route(
            "/feedback",
            get(feedback::feedback_page).post(feedback::submit_feedback),
        )
        .route("/admin/users", get(admin::users_page).post(admin::create_user))
        .route(
            "/admin/users/:id/edit",
            get(admin::edit_user_page).post(admin::update_user),
        )
        .route("/admin/users/:id/block", post(admin::block_user))
        .route("/admin/users/:id/password", post(admin::reset_password))
        .route("/admin/users/:id/delete", post(admin::delete_user))
        .route("/admin/feedback", get(admin::feedback_page))
        .route("/admin/feedback/:id/delete", post(admin::delete_feedback))
        .route("/admin/news", get(admin::news_page).post(admin::create_news))
        .route("/admin/news/:id/delete", post(admin::delete_news))
        .route("/admin/faq", get(admin::faq_page).post(admin::create_faq))
        .route("/admin/faq/:id/delete", post(admin::delete_faq))
        .route("/admin/log", get(admin::audit_log))
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/dashboard")
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
