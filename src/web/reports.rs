use std::collections::HashMap;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    db::{DepartmentSummaryRow, PublicationRow, lecturers, metrics, publications},
    export,
    roles::Capability,
    web::{
        AppState,
        auth::{current_user, require},
        escape_html,
        publications::render_publications_table,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub async fn reports_page(State(state): State<AppState>, jar: CookieJar) -> PageResult {
    let user = current_user(&state, &jar).await;
    let pool = state.pool_ref();

    let summary = lecturers::fetch_department_summary(pool)
        .await
        .map_err(|err| {
            error!(?err, "failed to load department summary");
            PageError::Internal
        })?;
    let rows = publications::fetch_publications(pool).await.map_err(|err| {
        error!(?err, "failed to load publications for report");
        PageError::Internal
    })?;
    let authors = publications::fetch_author_names(pool).await.map_err(|err| {
        error!(?err, "failed to load authors for report");
        PageError::Internal
    })?;

    let downloads = if user
        .as_ref()
        .is_some_and(|user| user.can(Capability::ExportReports))
    {
        r#"<section class="panel"><h2>Выгрузка</h2><div class="actions"><a href="/export/publications.csv">Публикации (CSV)</a><a href="/export/publications.xlsx">Публикации (XLSX)</a><a href="/export/metrics.csv">Показатели (CSV)</a></div></section>"#
    } else {
        ""
    };

    let body = format!(
        "{downloads}{departments}<h2>Все публикации</h2>{publications}",
        departments = render_department_summary(&summary),
        publications = render_publications_table(&rows, &authors, false),
    );

    Ok(Html(render_page(PageLayout::new(
        "Отчёты",
        user.as_ref(),
        body,
    ))))
}

fn render_department_summary(rows: &[DepartmentSummaryRow]) -> String {
    let body: String = if rows.is_empty() {
        r#"<tr><td colspan="4">Нет данных.</td></tr>"#.to_string()
    } else {
        rows.iter()
            .map(|row| {
                let department = if row.department.is_empty() {
                    "Без кафедры".to_string()
                } else {
                    escape_html(&row.department)
                };
                format!(
                    "<tr><td>{department}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    row.lecturers, row.publications, row.citations,
                )
            })
            .collect()
    };

    format!(
        r#"<section class="panel"><h2>По кафедрам</h2><table><thead><tr><th>Кафедра</th><th>Преподавателей</th><th>Публикаций</th><th>Цитирований</th></tr></thead><tbody>{body}</tbody></table></section>"#
    )
}

/// Wraps bytes as a file download.
fn attachment(bytes: Vec<u8>, filename: &str, content_type: &str) -> Response {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Err(err) => {
            error!(?err, content_type, "invalid export content type");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    let disposition = format!("attachment; filename=\"{filename}\"");
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(err) => {
            error!(?err, filename, "invalid export filename");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (headers, bytes).into_response()
}

async fn publication_export_data(
    state: &AppState,
) -> Result<(Vec<PublicationRow>, HashMap<i64, Vec<String>>), PageError> {
    let pool = state.pool_ref();
    let rows = publications::fetch_publications(pool).await.map_err(|err| {
        error!(?err, "failed to load publications for export");
        PageError::Internal
    })?;
    let authors = publications::fetch_author_names(pool).await.map_err(|err| {
        error!(?err, "failed to load authors for export");
        PageError::Internal
    })?;
    Ok((rows, authors))
}

pub async fn export_publications_csv(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    require(&state, &jar, Capability::ExportReports).await?;
    let (rows, authors) = publication_export_data(&state).await?;

    let bytes = export::publications_csv(&rows, &authors).map_err(|err| {
        error!(?err, "failed to build publications csv");
        PageError::Internal
    })?;
    Ok(attachment(bytes, "publications.csv", mime::TEXT_CSV_UTF_8.as_ref()))
}

pub async fn export_publications_xlsx(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    require(&state, &jar, Capability::ExportReports).await?;
    let (rows, authors) = publication_export_data(&state).await?;

    let bytes = export::publications_xlsx(&rows, &authors).map_err(|err| {
        error!(?err, "failed to build publications workbook");
        PageError::Internal
    })?;
    Ok(attachment(bytes, "publications.xlsx", XLSX_CONTENT_TYPE))
}

pub async fn export_metrics_csv(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    require(&state, &jar, Capability::ExportReports).await?;

    let rows = metrics::fetch_metrics_for_export(state.pool_ref())
        .await
        .map_err(|err| {
            error!(?err, "failed to load metrics for export");
            PageError::Internal
        })?;
    let bytes = export::metrics_csv(&rows).map_err(|err| {
        error!(?err, "failed to build metrics csv");
        PageError::Internal
    })?;
    Ok(attachment(bytes, "metrics.csv", mime::TEXT_CSV_UTF_8.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_sets_download_headers() {
        let response = attachment(b"a;b\n".to_vec(), "metrics.csv", mime::TEXT_CSV_UTF_8.as_ref());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"metrics.csv\""
        );
    }

    #[test]
    fn empty_department_gets_placeholder() {
        let html = render_department_summary(&[DepartmentSummaryRow {
            department: String::new(),
            lecturers: 1,
            publications: 2,
            citations: 7,
        }]);
        assert!(html.contains("Без кафедры"));
        assert!(html.contains("<td>7</td>"));
    }
}
