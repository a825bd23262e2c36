use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use crate::{
    db::{audit, content},
    roles::Capability,
    web::{
        AppState,
        auth::require,
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

#[derive(Deserialize)]
pub struct NewsForm {
    title: String,
    content: String,
}

#[derive(Deserialize)]
pub struct FaqForm {
    question: String,
    answer: String,
}

/// Both fields trimmed, or `None` when either is blank.
fn required_pair(first: &str, second: &str) -> Option<(String, String)> {
    let first = first.trim();
    let second = second.trim();
    (!first.is_empty() && !second.is_empty()).then(|| (first.to_string(), second.to_string()))
}

pub async fn news_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    let items = content::fetch_news(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to list news for admin");
        PageError::Internal
    })?;

    let rows: String = items
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td><a href="/news/{id}">{title}</a></td><td>{date}</td><td><form class="inline-form" method="post" action="/admin/news/{id}/delete"><button type="submit" class="danger">Удалить</button></form></td></tr>"#,
                id = item.id,
                title = escape_html(&item.title),
                date = item.created_at.format("%d.%m.%Y"),
            )
        })
        .collect();

    let body = format!(
        r#"<section class="panel"><h2>Новая новость</h2><form method="post" action="/admin/news">
    <label for="title">Заголовок *</label><input id="title" name="title" required>
    <label for="content">Текст *</label><textarea id="content" name="content" rows="6" required></textarea>
    <button type="submit">Опубликовать</button>
</form></section>
<section class="panel"><table><thead><tr><th>Заголовок</th><th>Дата</th><th></th></tr></thead><tbody>{rows}</tbody></table></section>"#
    );

    Ok(Html(render_page(
        PageLayout::new("Управление новостями", Some(&admin), body).with_flash(params.render()),
    )))
}

pub async fn create_news(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NewsForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    let Some((title, text)) = required_pair(&form.title, &form.content) else {
        return Ok(Redirect::to("/admin/news?error=missing_fields"));
    };

    match content::create_news(state.pool_ref(), &title, &text).await {
        Ok(news_id) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "create_news",
                format!("Опубликована новость #{news_id}: {title}"),
            )
            .await;
            Ok(Redirect::to("/admin/news?status=news_created"))
        }
        Err(err) => {
            error!(?err, "failed to create news");
            Ok(Redirect::to("/admin/news?error=unknown"))
        }
    }
}

pub async fn delete_news(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(news_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    match content::delete_news(state.pool_ref(), news_id).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_news",
                format!("Удалена новость #{news_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/news?status=news_deleted"))
        }
        Ok(false) => Ok(Redirect::to("/admin/news?error=news_not_found")),
        Err(err) => {
            error!(?err, news_id, "failed to delete news");
            Ok(Redirect::to("/admin/news?error=unknown"))
        }
    }
}

pub async fn faq_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    let entries = content::fetch_faq(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to list faq for admin");
        PageError::Internal
    })?;

    let rows: String = entries
        .iter()
        .map(|entry| {
            format!(
                r#"<tr><td>{question}</td><td>{answer}</td><td><form class="inline-form" method="post" action="/admin/faq/{id}/delete"><button type="submit" class="danger">Удалить</button></form></td></tr>"#,
                id = entry.id,
                question = escape_html(&entry.question),
                answer = escape_html(&entry.answer),
            )
        })
        .collect();

    let body = format!(
        r#"<section class="panel"><h2>Новый вопрос</h2><form method="post" action="/admin/faq">
    <label for="question">Вопрос *</label><input id="question" name="question" required>
    <label for="answer">Ответ *</label><textarea id="answer" name="answer" rows="4" required></textarea>
    <button type="submit">Добавить</button>
</form></section>
<section class="panel"><table><thead><tr><th>Вопрос</th><th>Ответ</th><th></th></tr></thead><tbody>{rows}</tbody></table></section>"#
    );

    Ok(Html(render_page(
        PageLayout::new("Управление FAQ", Some(&admin), body).with_flash(params.render()),
    )))
}

pub async fn create_faq(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<FaqForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    let Some((question, answer)) = required_pair(&form.question, &form.answer) else {
        return Ok(Redirect::to("/admin/faq?error=missing_fields"));
    };

    match content::create_faq(state.pool_ref(), &question, &answer).await {
        Ok(faq_id) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "create_faq",
                format!("Добавлен вопрос #{faq_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/faq?status=faq_created"))
        }
        Err(err) => {
            error!(?err, "failed to create faq entry");
            Ok(Redirect::to("/admin/faq?error=unknown"))
        }
    }
}

pub async fn delete_faq(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(faq_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageContent).await?;

    match content::delete_faq(state.pool_ref(), faq_id).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_faq",
                format!("Удалён вопрос #{faq_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/faq?status=faq_deleted"))
        }
        Ok(false) => Ok(Redirect::to("/admin/faq?error=faq_not_found")),
        Err(err) => {
            error!(?err, faq_id, "failed to delete faq entry");
            Ok(Redirect::to("/admin/faq?error=unknown"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_pair_trims_and_rejects_blanks() {
        assert_eq!(
            required_pair(" Q ", " A "),
            Some(("Q".to_string(), "A".to_string()))
        );
        assert_eq!(required_pair("Q", "  "), None);
        assert_eq!(required_pair("", "A"), None);
    }
}
