use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::{Form, cookie::CookieJar};
use tracing::error;

use crate::{
    db::{PublicationRow, audit, publications},
    roles::Capability,
    web::{
        AppState,
        auth::require,
        escape_html,
        flash::FlashQuery,
        publications::{PublicationForm, render_publication_inputs},
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page, status_badge},
    },
};

pub async fn my_publications(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::SubmitPublications).await?;

    let Some(lecturer_id) = user.lecturer_id else {
        let body = r#"<section class="panel"><p class="note">Учётная запись не связана с карточкой преподавателя. Обратитесь к администратору.</p></section>"#;
        return Ok(Html(render_page(PageLayout::new(
            "Мои публикации",
            Some(&user),
            body,
        ))));
    };

    let own = publications::fetch_publications_by_lecturer(state.pool_ref(), lecturer_id)
        .await
        .map_err(|err| {
            error!(?err, lecturer_id, "failed to load own publications");
            PageError::Internal
        })?;

    let body = format!(
        r#"{table}<section class="panel"><h2>Подать публикацию</h2><p class="note">Публикация попадёт в очередь проверки научного отдела.</p><form method="post" action="/my/publications">
    {inputs}
    <button type="submit">Отправить</button>
</form></section>"#,
        table = render_own_table(&own),
        inputs = render_publication_inputs(None),
    );

    Ok(Html(render_page(
        PageLayout::new("Мои публикации", Some(&user), body).with_flash(params.render()),
    )))
}

fn render_own_table(rows: &[PublicationRow]) -> String {
    if rows.is_empty() {
        return r#"<section class="panel"><p class="note">Вы ещё не подавали публикаций.</p></section>"#.to_string();
    }

    let body: String = rows
        .iter()
        .map(|publication| {
            format!(
                "<tr><td>{title}</td><td>{year}</td><td>{journal}</td><td>{status}</td><td>{comment}</td><td>{deadline}</td></tr>",
                title = escape_html(&publication.title),
                year = publication.year,
                journal = escape_html(&publication.journal),
                status = status_badge(publication.status()),
                comment = publication
                    .review_comment
                    .as_deref()
                    .map(escape_html)
                    .unwrap_or_else(|| "—".to_string()),
                deadline = publication
                    .revision_deadline
                    .map(|date| date.format("%d.%m.%Y").to_string())
                    .unwrap_or_else(|| "—".to_string()),
            )
        })
        .collect();

    format!(
        r#"<section class="panel"><table><thead><tr><th>Название</th><th>Год</th><th>Журнал</th><th>Статус</th><th>Комментарий</th><th>Срок доработки</th></tr></thead><tbody>{body}</tbody></table></section>"#
    )
}

pub async fn submit_publication(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PublicationForm>,
) -> Result<Redirect, Redirect> {
    let user = require(&state, &jar, Capability::SubmitPublications).await?;

    let Some(lecturer_id) = user.lecturer_id else {
        return Ok(Redirect::to("/my/publications?error=not_linked"));
    };

    let fields = match form.fields() {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("/my/publications?error={code}"))),
    };

    match publications::create_publication(state.pool_ref(), &fields, &[lecturer_id]).await {
        Ok(publication) => {
            audit::record(
                state.pool_ref(),
                user.id,
                "submit_publication",
                format!("Подана публикация #{}: {}", publication.id, publication.title),
            )
            .await;
            Ok(Redirect::to("/my/publications?status=submitted"))
        }
        Err(err) => {
            error!(?err, lecturer_id, "failed to submit publication");
            Ok(Redirect::to("/my/publications?error=unknown"))
        }
    }
}
