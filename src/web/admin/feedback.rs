use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    db::{audit, content},
    roles::Capability,
    web::{
        AppState,
        auth::require,
        content::render_paragraphs,
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

pub async fn feedback_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let admin = require(&state, &jar, Capability::ModerateFeedback).await?;

    let messages = content::fetch_feedback(state.pool_ref())
        .await
        .map_err(|err| {
            error!(?err, "failed to list feedback");
            PageError::Internal
        })?;

    let body: String = if messages.is_empty() {
        r#"<section class="panel"><p class="note">Сообщений нет.</p></section>"#.to_string()
    } else {
        messages
            .iter()
            .map(|message| {
                let email = if message.email.is_empty() {
                    String::new()
                } else {
                    format!(" · {}", escape_html(&message.email))
                };
                format!(
                    r#"<section class="panel"><h2>{name}</h2><p class="note">{date}{email}</p>{text}<form class="inline-form" method="post" action="/admin/feedback/{id}/delete"><button type="submit" class="danger">Удалить</button></form></section>"#,
                    id = message.id,
                    name = escape_html(&message.name),
                    date = message.created_at.format("%d.%m.%Y %H:%M"),
                    text = render_paragraphs(&message.message),
                )
            })
            .collect()
    };

    Ok(Html(render_page(
        PageLayout::new("Обратная связь", Some(&admin), body).with_flash(params.render()),
    )))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(feedback_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ModerateFeedback).await?;

    match content::delete_feedback(state.pool_ref(), feedback_id).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_feedback",
                format!("Удалено сообщение #{feedback_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/feedback?status=feedback_deleted"))
        }
        Ok(false) => Ok(Redirect::to("/admin/feedback?error=feedback_not_found")),
        Err(err) => {
            error!(?err, feedback_id, "failed to delete feedback");
            Ok(Redirect::to("/admin/feedback?error=unknown"))
        }
    }
}
