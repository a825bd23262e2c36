use axum::{
    extract::{Path, State},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    db::content,
    web::{
        AppState,
        auth::current_user,
        escape_html,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

/// Keeps paragraph breaks of plain-text content.
pub(crate) fn render_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| format!("<p>{}</p>", escape_html(paragraph).replace('\n', "<br>")))
        .collect()
}

pub async fn news_list(State(state): State<AppState>, jar: CookieJar) -> PageResult {
    let user = current_user(&state, &jar).await;

    let items = content::fetch_news(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to list news");
        PageError::Internal
    })?;

    let body: String = if items.is_empty() {
        r#"<section class="panel"><p class="note">Новостей пока нет.</p></section>"#.to_string()
    } else {
        items
            .iter()
            .map(|item| {
                format!(
                    r#"<section class="panel"><h2><a href="/news/{id}">{title}</a></h2><p class="note">{date}</p></section>"#,
                    id = item.id,
                    title = escape_html(&item.title),
                    date = item.created_at.format("%d.%m.%Y"),
                )
            })
            .collect()
    };

    Ok(Html(render_page(PageLayout::new("Новости", user.as_ref(), body))))
}

pub async fn news_item(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(news_id): Path<i64>,
) -> PageResult {
    let user = current_user(&state, &jar).await;

    let item = match content::fetch_news_item(state.pool_ref(), news_id).await {
        Ok(Some(item)) => item,
        Ok(None) => return Err(PageError::NotFound),
        Err(err) => {
            error!(?err, news_id, "failed to load news item");
            return Err(PageError::Internal);
        }
    };

    let body = format!(
        r#"<section class="panel"><p class="note">{date}</p>{content}<p><a href="/news">← Все новости</a></p></section>"#,
        date = item.created_at.format("%d.%m.%Y"),
        content = render_paragraphs(&item.content),
    );

    Ok(Html(render_page(PageLayout::new(&item.title, user.as_ref(), body))))
}

pub async fn faq_page(State(state): State<AppState>, jar: CookieJar) -> PageResult {
    let user = current_user(&state, &jar).await;

    let entries = content::fetch_faq(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to list faq");
        PageError::Internal
    })?;

    let body: String = if entries.is_empty() {
        r#"<section class="panel"><p class="note">Вопросов пока нет.</p></section>"#.to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                format!(
                    r#"<section class="panel"><h2>{question}</h2>{answer}</section>"#,
                    question = escape_html(&entry.question),
                    answer = render_paragraphs(&entry.answer),
                )
            })
            .collect()
    };

    Ok(Html(render_page(PageLayout::new(
        "Частые вопросы",
        user.as_ref(),
        body,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_split_on_blank_lines_and_escape() {
        let html = render_paragraphs("Первый <абзац>\nстрока\n\n\n  Второй  ");
        assert_eq!(html, "<p>Первый &lt;абзац&gt;<br>строка</p><p>Второй</p>");
    }
}
