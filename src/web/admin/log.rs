use axum::{
    extract::State,
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    db::audit,
    roles::Capability,
    web::{
        AppState,
        auth::require,
        escape_html,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

const LOG_PAGE_LIMIT: i64 = 500;

pub async fn audit_log(State(state): State<AppState>, jar: CookieJar) -> PageResult {
    let admin = require(&state, &jar, Capability::ViewAuditLog).await?;

    let entries = audit::fetch_logs(state.pool_ref(), LOG_PAGE_LIMIT)
        .await
        .map_err(|err| {
            error!(?err, "failed to load audit log");
            PageError::Internal
        })?;

    let rows: String = if entries.is_empty() {
        r#"<tr><td colspan="4">Записей нет.</td></tr>"#.to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                let actor = entry
                    .user_fio
                    .as_deref()
                    .map(escape_html)
                    .unwrap_or_else(|| "—".to_string());
                format!(
                    "<tr><td>{date}</td><td>{actor}</td><td>{action}</td><td>{description}</td></tr>",
                    date = entry.created_at.format("%d.%m.%Y %H:%M:%S"),
                    action = escape_html(&entry.action),
                    description = escape_html(&entry.description),
                )
            })
            .collect()
    };

    let body = format!(
        r#"<section class="panel"><p class="note">Последние {LOG_PAGE_LIMIT} записей.</p><table><thead><tr><th>Время (UTC)</th><th>Пользователь</th><th>Действие</th><th>Описание</th></tr></thead><tbody>{rows}</tbody></table></section>"#
    );

    Ok(Html(render_page(PageLayout::new(
        "Журнал действий",
        Some(&admin),
        body,
    ))))
}
