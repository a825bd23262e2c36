use std::collections::HashMap;

use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use crate::{
    db::{PublicationRow, audit, publications},
    review::{self, ReviewAction, ReviewError, ReviewStatus},
    roles::Capability,
    validation::{clean_optional, parse_optional_date},
    web::{
        AppState,
        auth::{current_user, denied_redirect, require},
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_link, render_page, status_badge},
    },
};

#[derive(Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
}

pub async fn review_queue(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ReviewPublications).await?;
    let pool = state.pool_ref();

    let authors = publications::fetch_author_names(pool).await.map_err(|err| {
        error!(?err, "failed to load authors for review queue");
        PageError::Internal
    })?;

    let mut body = String::new();
    for status in ReviewStatus::ALL {
        let rows = publications::fetch_publications_by_status(pool, status)
            .await
            .map_err(|err| {
                error!(?err, status = status.as_str(), "failed to load review queue");
                PageError::Internal
            })?;
        body.push_str(&render_status_group(status, &rows, &authors));
    }

    Ok(Html(render_page(
        PageLayout::new("Проверка публикаций", Some(&user), body).with_flash(params.render()),
    )))
}

fn render_status_group(
    status: ReviewStatus,
    rows: &[PublicationRow],
    authors: &HashMap<i64, Vec<String>>,
) -> String {
    let cards: String = if rows.is_empty() {
        r#"<p class="note">Нет публикаций.</p>"#.to_string()
    } else {
        rows.iter()
            .map(|publication| render_review_card(publication, authors.get(&publication.id)))
            .collect()
    };

    format!(
        r#"<section class="panel"><h2>{label} ({count})</h2>{cards}</section>"#,
        label = status.label_ru(),
        count = rows.len(),
    )
}

fn render_review_card(publication: &PublicationRow, authors: Option<&Vec<String>>) -> String {
    let id = publication.id;
    let author_list = authors
        .map(|names| escape_html(&names.join(", ")))
        .unwrap_or_else(|| "—".to_string());
    let comment = publication
        .review_comment
        .as_deref()
        .map(|comment| format!(r#"<p class="note">Комментарий: {}</p>"#, escape_html(comment)))
        .unwrap_or_default();
    let deadline = publication
        .revision_deadline
        .map(|date| format!(r#"<p class="note">Срок доработки: {}</p>"#, date.format("%d.%m.%Y")))
        .unwrap_or_default();

    format!(
        r#"<div class="review-card">
    <h3>{title} {badge}</h3>
    <p>{author_list} · {year} · {journal} · цитирований: {citations} · {link}</p>
    {comment}{deadline}
    <div class="review-forms">
        <form method="post" action="/publications/{id}/approve">
            <label>Комментарий</label><textarea name="comment" rows="2"></textarea>
            <button type="submit">Одобрить</button>
        </form>
        <form method="post" action="/publications/{id}/reject">
            <label>Комментарий</label><textarea name="comment" rows="2"></textarea>
            <button type="submit" class="danger">Отклонить</button>
        </form>
        <form method="post" action="/publications/{id}/revision">
            <label>Замечания</label><textarea name="comment" rows="2"></textarea>
            <label>Срок</label><input type="date" name="deadline">
            <button type="submit">На доработку</button>
        </form>
    </div>
</div>"#,
        title = escape_html(&publication.title),
        badge = status_badge(publication.status()),
        year = publication.year,
        journal = escape_html(&publication.journal),
        citations = publication.citations,
        link = render_link(&publication.link),
    )
}

fn flash_status(action: &ReviewAction) -> &'static str {
    match action {
        ReviewAction::Approve { .. } => "approved",
        ReviewAction::Reject { .. } => "rejected",
        ReviewAction::SendToRevision { .. } => "revision",
    }
}

async fn run_review(
    state: &AppState,
    jar: &CookieJar,
    publication_id: i64,
    action: ReviewAction,
) -> Result<Redirect, Redirect> {
    let Some(user) = current_user(state, jar).await else {
        return Err(Redirect::to("/login"));
    };

    match review::apply(state.pool_ref(), &user.actor(), publication_id, &action).await {
        Ok(publication) => {
            audit::record(
                state.pool_ref(),
                user.id,
                action.tag(),
                format!(
                    "Публикация #{}: {}",
                    publication.id,
                    publication.status().label_ru()
                ),
            )
            .await;
            Ok(Redirect::to(&format!(
                "/review?status={}",
                flash_status(&action)
            )))
        }
        Err(ReviewError::Forbidden(denied)) => Err(denied_redirect(denied)),
        Err(err) => Ok(Redirect::to(&format!("/review?error={}", err.code()))),
    }
}

pub async fn approve(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, Redirect> {
    let action = ReviewAction::Approve {
        comment: clean_optional(form.comment.as_deref()),
    };
    run_review(&state, &jar, publication_id, action).await
}

pub async fn reject(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, Redirect> {
    let action = ReviewAction::Reject {
        comment: clean_optional(form.comment.as_deref()),
    };
    run_review(&state, &jar, publication_id, action).await
}

pub async fn send_to_revision(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, Redirect> {
    let deadline = match parse_optional_date(form.deadline.as_deref()) {
        Ok(deadline) => deadline,
        Err(_) => return Ok(Redirect::to("/review?error=invalid_date")),
    };

    let action = ReviewAction::SendToRevision {
        comment: clean_optional(form.comment.as_deref()),
        deadline,
    };
    run_review(&state, &jar, publication_id, action).await
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    #[test]
    fn card_shows_comment_deadline_and_forms() {
        let publication = PublicationRow {
            id: 9,
            title: "Paper <X>".to_string(),
            year: 2023,
            journal: "Journal".to_string(),
            source: "Scopus".to_string(),
            link: String::new(),
            citations: 4,
            doi: String::new(),
            status: "revision_required".to_string(),
            review_comment: Some("add DOI".to_string()),
            revision_deadline: NaiveDate::from_ymd_opt(2025, 3, 1),
            reviewer_id: Some(2),
            created_at: Utc::now(),
        };

        let html = render_review_card(&publication, None);
        assert!(html.contains("Paper &lt;X&gt;"));
        assert!(html.contains("Комментарий: add DOI"));
        assert!(html.contains("01.03.2025"));
        assert!(html.contains(r#"action="/publications/9/approve""#));
        assert!(html.contains(r#"action="/publications/9/revision""#));
    }

    #[test]
    fn flash_codes_match_actions() {
        assert_eq!(flash_status(&ReviewAction::Approve { comment: None }), "approved");
        assert_eq!(flash_status(&ReviewAction::Reject { comment: None }), "rejected");
        assert_eq!(
            flash_status(&ReviewAction::SendToRevision {
                comment: None,
                deadline: None
            }),
            "revision"
        );
    }
}
