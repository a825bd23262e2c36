use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    db::{
        FeedbackRow, LecturerRow, MetricRow, PublicationRow, content, lecturers, metrics, publications,
    },
    review::ReviewStatus,
    roles::{Capability, Role},
    web::{
        AppState, AuthUser,
        auth::require,
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ViewDashboard).await?;
    let pool = state.pool_ref();

    let all_lecturers = lecturers::fetch_lecturers(pool).await.map_err(|err| {
        error!(?err, "failed to load lecturers for dashboard");
        PageError::Internal
    })?;
    let latest = metrics::fetch_latest_metrics(pool).await.map_err(|err| {
        error!(?err, "failed to load latest metrics for dashboard");
        PageError::Internal
    })?;
    let all_publications = publications::fetch_publications(pool).await.map_err(|err| {
        error!(?err, "failed to load publications for dashboard");
        PageError::Internal
    })?;

    let mut body = render_stats(all_lecturers.len(), &all_publications);
    body.push_str(&render_role_panel(&user, &all_publications));

    if user.role == Role::Lecturer {
        if let Some(lecturer_id) = user.lecturer_id {
            let own = publications::fetch_publications_by_lecturer(pool, lecturer_id)
                .await
                .map_err(|err| {
                    error!(?err, lecturer_id, "failed to load lecturer publications");
                    PageError::Internal
                })?;
            body.push_str(&render_own_summary(&own));
        }
    }

    body.push_str(&render_latest_metrics(&all_lecturers, &latest));

    if user.can(Capability::ModerateFeedback) {
        let feedback = content::fetch_feedback(pool).await.map_err(|err| {
            error!(?err, "failed to load feedback for dashboard");
            PageError::Internal
        })?;
        body.push_str(&render_recent_feedback(&feedback));
    }

    Ok(Html(render_page(
        PageLayout::new("Главная", Some(&user), body).with_flash(params.render()),
    )))
}

fn count_status(publications: &[PublicationRow], status: ReviewStatus) -> usize {
    publications
        .iter()
        .filter(|publication| publication.status() == status)
        .count()
}

fn render_stats(lecturer_count: usize, publications: &[PublicationRow]) -> String {
    let mut tiles = format!(
        r#"<div class="stat"><strong>{lecturer_count}</strong>преподавателей</div><div class="stat"><strong>{total}</strong>публикаций</div>"#,
        total = publications.len(),
    );
    for status in ReviewStatus::ALL {
        tiles.push_str(&format!(
            r#"<div class="stat"><strong>{count}</strong>{label}</div>"#,
            count = count_status(publications, status),
            label = status.label_ru(),
        ));
    }
    format!(r#"<section class="panel"><h2>Сводка</h2><div class="stats">{tiles}</div></section>"#)
}

fn render_role_panel(user: &AuthUser, publications: &[PublicationRow]) -> String {
    let mut links = Vec::new();

    if user.can(Capability::ManageLecturers) {
        links.push(r#"<a href="/lecturers/new">Добавить преподавателя</a>"#.to_string());
    }
    if user.can(Capability::ManagePublications) {
        links.push(r#"<a href="/publications/new">Добавить публикацию</a>"#.to_string());
    }
    if user.can(Capability::ReviewPublications) {
        let pending = count_status(publications, ReviewStatus::New);
        links.push(format!(
            r#"<a href="/review">Очередь проверки ({pending})</a>"#
        ));
    }
    if user.can(Capability::SubmitPublications) {
        links.push(r#"<a href="/my/publications">Подать публикацию</a>"#.to_string());
    }
    if user.can(Capability::ExportReports) {
        links.push(r#"<a href="/export/publications.csv">Публикации (CSV)</a>"#.to_string());
        links.push(r#"<a href="/export/publications.xlsx">Публикации (XLSX)</a>"#.to_string());
        links.push(r#"<a href="/export/metrics.csv">Показатели (CSV)</a>"#.to_string());
    }

    if links.is_empty() {
        return String::new();
    }

    format!(
        r#"<section class="panel"><h2>Действия</h2><div class="actions">{}</div></section>"#,
        links.join("")
    )
}

fn render_own_summary(own: &[PublicationRow]) -> String {
    let revision = count_status(own, ReviewStatus::RevisionRequired);
    let note = if revision > 0 {
        format!(
            r#"<p class="note">Требуют доработки: {revision}. Подробности на странице <a href="/my/publications">«Мои публикации»</a>.</p>"#
        )
    } else {
        String::new()
    };
    format!(
        r#"<section class="panel"><h2>Мои публикации</h2><p>Всего: {total}, одобрено: {approved}.</p>{note}</section>"#,
        total = own.len(),
        approved = count_status(own, ReviewStatus::Approved),
    )
}

/// One row per lecturer with their most recent yearly snapshot, if any.
fn render_latest_metrics(lecturers: &[LecturerRow], latest: &[MetricRow]) -> String {
    if lecturers.is_empty() {
        return String::new();
    }

    let by_lecturer: HashMap<i64, &MetricRow> =
        latest.iter().map(|row| (row.lecturer_id, row)).collect();

    let rows: String = lecturers
        .iter()
        .map(|lecturer| {
            let cells = match by_lecturer.get(&lecturer.id) {
                Some(metric) => format!(
                    "<td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                    metric.year, metric.total_publications, metric.total_citations, metric.h_index
                ),
                None => r#"<td colspan="4" class="note">Показатели не внесены</td>"#.to_string(),
            };
            format!(
                r#"<tr><td><a href="/lecturers/{id}">{fio}</a></td><td>{department}</td>{cells}</tr>"#,
                id = lecturer.id,
                fio = escape_html(&lecturer.fio),
                department = escape_html(&lecturer.department),
            )
        })
        .collect();

    format!(
        r#"<section class="panel"><h2>Преподаватели</h2><table><thead><tr><th>ФИО</th><th>Кафедра</th><th>Год</th><th>Публикаций</th><th>Цитирований</th><th>h-индекс</th></tr></thead><tbody>{rows}</tbody></table></section>"#
    )
}

const RECENT_FEEDBACK_LIMIT: usize = 5;

fn render_recent_feedback(feedback: &[FeedbackRow]) -> String {
    let items: String = if feedback.is_empty() {
        r#"<p class="note">Сообщений нет.</p>"#.to_string()
    } else {
        let list: String = feedback
            .iter()
            .take(RECENT_FEEDBACK_LIMIT)
            .map(|message| {
                format!(
                    "<li><strong>{name}</strong> ({date}): {text}</li>",
                    name = escape_html(&message.name),
                    date = message.created_at.format("%d.%m.%Y"),
                    text = escape_html(&message.message),
                )
            })
            .collect();
        format!("<ul>{list}</ul>")
    };

    format!(
        r#"<section class="panel"><h2>Обратная связь ({total})</h2>{items}<p><a href="/admin/feedback">Все сообщения</a></p></section>"#,
        total = feedback.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lecturer(id: i64, fio: &str) -> LecturerRow {
        LecturerRow {
            id,
            fio: fio.to_string(),
            department: "Кафедра математики".to_string(),
            ..LecturerRow::default()
        }
    }

    fn metric(lecturer_id: i64, year: i32, h_index: i32) -> MetricRow {
        MetricRow {
            id: lecturer_id * 100 + i64::from(year),
            lecturer_id,
            year,
            total_publications: 4,
            total_citations: 12,
            h_index,
            rinc: 0,
            scopus: 0,
            wos: 0,
            google_scholar: 0,
        }
    }

    #[test]
    fn latest_metrics_table_marks_lecturers_without_snapshot() {
        let html = render_latest_metrics(
            &[lecturer(1, "Иванов И.И."), lecturer(2, "<Петрова>")],
            &[metric(1, 2023, 3)],
        );
        assert!(html.contains(r#"<a href="/lecturers/1">Иванов И.И.</a>"#));
        assert!(html.contains("<td>2023</td><td>4</td><td>12</td><td>3</td>"));
        assert!(html.contains("&lt;Петрова&gt;"));
        assert_eq!(html.matches("Показатели не внесены").count(), 1);
    }

    #[test]
    fn latest_metrics_table_is_omitted_without_lecturers() {
        assert!(render_latest_metrics(&[], &[metric(1, 2023, 3)]).is_empty());
    }

    #[test]
    fn recent_feedback_is_capped_and_links_to_moderation() {
        let feedback: Vec<FeedbackRow> = (0..7)
            .map(|id| FeedbackRow {
                id,
                name: format!("Гость {id}"),
                email: "guest@example.com".to_string(),
                message: "Вопрос".to_string(),
                created_at: Utc::now(),
            })
            .collect();
        let html = render_recent_feedback(&feedback);
        assert_eq!(html.matches("<li>").count(), RECENT_FEEDBACK_LIMIT);
        assert!(html.contains("Обратная связь (7)"));
        assert!(html.contains(r#"href="/admin/feedback""#));
    }
}
