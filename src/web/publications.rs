use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::{Form, cookie::CookieJar};
use serde::Deserialize;
use tracing::error;

use crate::{
    db::{
        self, PublicationRow, audit, lecturers,
        publications::{self, PublicationFields},
    },
    roles::Capability,
    validation::{parse_count, parse_year},
    web::{
        AppState,
        auth::{current_user, require},
        escape_html,
        flash::FlashQuery,
        lecturers::render_lecturer_checkboxes,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_link, render_page, status_badge},
    },
};

#[derive(Deserialize)]
pub struct PublicationForm {
    title: String,
    year: String,
    #[serde(default)]
    journal: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    citations: String,
    #[serde(default)]
    doi: String,
    #[serde(default)]
    lecturer_ids: Vec<i64>,
}

impl PublicationForm {
    pub(crate) fn fields(&self) -> Result<PublicationFields, &'static str> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("missing_fields");
        }
        let year = parse_year(&self.year).ok_or("invalid_year")?;
        let citations = parse_count(&self.citations).ok_or("invalid_count")?;

        Ok(PublicationFields {
            title: title.to_string(),
            year,
            journal: self.journal.trim().to_string(),
            source: self.source.trim().to_string(),
            link: self.link.trim().to_string(),
            citations,
            doi: self.doi.trim().to_string(),
        })
    }

    pub(crate) fn lecturer_ids(&self) -> &[i64] {
        &self.lecturer_ids
    }
}

/// Bibliographic inputs shared by the admin and lecturer forms.
pub(crate) fn render_publication_inputs(publication: Option<&PublicationRow>) -> String {
    let text = |value: Option<&String>| value.map(|value| escape_html(value)).unwrap_or_default();
    let year = publication.map(|row| row.year.to_string()).unwrap_or_default();
    let citations = publication
        .map(|row| row.citations.to_string())
        .unwrap_or_else(|| "0".to_string());

    format!(
        r#"<label for="title">Название *</label><input id="title" name="title" value="{title}" required>
    <label for="year">Год *</label><input id="year" name="year" inputmode="numeric" value="{year}" required>
    <label for="journal">Журнал</label><input id="journal" name="journal" value="{journal}">
    <label for="source">Источник (РИНЦ, Scopus, WoS, Google Scholar)</label><input id="source" name="source" value="{source}">
    <label for="link">Ссылка</label><input id="link" name="link" value="{link}">
    <label for="citations">Цитирования</label><input id="citations" name="citations" inputmode="numeric" value="{citations}">
    <label for="doi">DOI/ID</label><input id="doi" name="doi" value="{doi}">"#,
        title = text(publication.map(|row| &row.title)),
        journal = text(publication.map(|row| &row.journal)),
        source = text(publication.map(|row| &row.source)),
        link = text(publication.map(|row| &row.link)),
        doi = text(publication.map(|row| &row.doi)),
    )
}

fn render_authors(authors: Option<&Vec<String>>) -> String {
    match authors {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| escape_html(name))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "—".to_string(),
    }
}

pub async fn list_publications(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = current_user(&state, &jar).await;
    let can_manage = user
        .as_ref()
        .is_some_and(|user| user.can(Capability::ManagePublications));
    let pool = state.pool_ref();

    let rows = publications::fetch_publications(pool).await.map_err(|err| {
        error!(?err, "failed to list publications");
        PageError::Internal
    })?;
    let authors = publications::fetch_author_names(pool).await.map_err(|err| {
        error!(?err, "failed to load publication authors");
        PageError::Internal
    })?;

    let body = format!(
        "{add_link}{table}",
        add_link = if can_manage {
            r#"<p><a href="/publications/new">+ Добавить публикацию</a></p>"#
        } else {
            ""
        },
        table = render_publications_table(&rows, &authors, can_manage),
    );

    Ok(Html(render_page(
        PageLayout::new("Публикации", user.as_ref(), body).with_flash(params.render()),
    )))
}

pub(crate) fn render_publications_table(
    rows: &[PublicationRow],
    authors: &HashMap<i64, Vec<String>>,
    with_actions: bool,
) -> String {
    let mut table_rows = String::new();
    if rows.is_empty() {
        table_rows.push_str(r#"<tr><td colspan="8">Публикаций пока нет.</td></tr>"#);
    }

    for publication in rows {
        let actions = if with_actions {
            format!(
                r#"<td class="actions"><a href="/publications/{id}/edit">Изменить</a><form class="inline-form" method="post" action="/publications/{id}/delete" onsubmit="return confirm('Удалить публикацию?');"><button type="submit" class="danger">Удалить</button></form></td>"#,
                id = publication.id
            )
        } else {
            String::new()
        };
        table_rows.push_str(&format!(
            "<tr><td>{title}</td><td>{authors}</td><td>{year}</td><td>{journal}</td><td>{source}</td><td>{citations}</td><td>{link}</td><td>{status}</td>{actions}</tr>",
            title = escape_html(&publication.title),
            authors = render_authors(authors.get(&publication.id)),
            year = publication.year,
            journal = escape_html(&publication.journal),
            source = escape_html(&publication.source),
            citations = publication.citations,
            link = render_link(&publication.link),
            status = status_badge(publication.status()),
        ));
    }

    let actions_header = if with_actions { "<th>Действия</th>" } else { "" };
    format!(
        r#"<section class="panel"><table><thead><tr><th>Название</th><th>Авторы</th><th>Год</th><th>Журнал</th><th>Источник</th><th>Цитирования</th><th>Ссылка</th><th>Статус</th>{actions_header}</tr></thead><tbody>{table_rows}</tbody></table></section>"#
    )
}

async fn render_admin_form(
    state: &AppState,
    action: &str,
    publication: Option<&PublicationRow>,
    selected: &[i64],
) -> Result<String, PageError> {
    let all_lecturers = lecturers::fetch_lecturers(state.pool_ref())
        .await
        .map_err(|err| {
            error!(?err, "failed to load lecturers for publication form");
            PageError::Internal
        })?;

    let review_note = publication
        .map(|row| {
            let comment = row
                .review_comment
                .as_deref()
                .map(escape_html)
                .unwrap_or_else(|| "—".to_string());
            format!(
                r#"<p class="note">Статус: {status}. Комментарий рецензента: {comment}</p>"#,
                status = status_badge(row.status()),
            )
        })
        .unwrap_or_default();

    Ok(format!(
        r#"<section class="panel">{review_note}<form method="post" action="{action}">
    {inputs}
    <label>Авторы</label>{authors}
    <button type="submit">Сохранить</button>
</form></section>"#,
        inputs = render_publication_inputs(publication),
        authors = render_lecturer_checkboxes(&all_lecturers, selected),
    ))
}

pub async fn new_publication_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ManagePublications).await?;
    let body = render_admin_form(&state, "/publications/new", None, &[]).await?;
    Ok(Html(render_page(
        PageLayout::new("Новая публикация", Some(&user), body).with_flash(params.render()),
    )))
}

pub async fn create_publication(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PublicationForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManagePublications).await?;

    let fields = match form.fields() {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("/publications/new?error={code}"))),
    };

    match publications::create_publication(state.pool_ref(), &fields, form.lecturer_ids()).await {
        Ok(publication) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "create_publication",
                format!("Добавлена публикация #{}: {}", publication.id, publication.title),
            )
            .await;
            Ok(Redirect::to("/publications?status=publication_created"))
        }
        Err(err) if db::is_foreign_key_violation(&err) => {
            Ok(Redirect::to("/publications/new?error=unknown_lecturer"))
        }
        Err(err) => {
            error!(?err, "failed to create publication");
            Ok(Redirect::to("/publications/new?error=unknown"))
        }
    }
}

pub async fn edit_publication_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ManagePublications).await?;

    let (publication, authors) =
        match publications::fetch_publication_with_lecturers(state.pool_ref(), publication_id).await
        {
            Ok(Some(found)) => found,
            Ok(None) => return Err(PageError::NotFound),
            Err(err) => {
                error!(?err, publication_id, "failed to load publication");
                return Err(PageError::Internal);
            }
        };

    let selected: Vec<i64> = authors.iter().map(|lecturer| lecturer.id).collect();
    let body = render_admin_form(
        &state,
        &format!("/publications/{publication_id}/edit"),
        Some(&publication),
        &selected,
    )
    .await?;

    Ok(Html(render_page(
        PageLayout::new("Редактирование публикации", Some(&user), body)
            .with_flash(params.render()),
    )))
}

pub async fn update_publication(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
    Form(form): Form<PublicationForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManagePublications).await?;
    let edit_url = format!("/publications/{publication_id}/edit");

    let fields = match form.fields() {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("{edit_url}?error={code}"))),
    };

    match publications::update_publication(
        state.pool_ref(),
        publication_id,
        &fields,
        form.lecturer_ids(),
    )
    .await
    {
        Ok(Some(publication)) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "update_publication",
                format!("Обновлена публикация #{}: {}", publication.id, publication.title),
            )
            .await;
            Ok(Redirect::to("/publications?status=publication_updated"))
        }
        Ok(None) => Ok(Redirect::to("/publications?error=publication_not_found")),
        Err(err) if db::is_foreign_key_violation(&err) => {
            Ok(Redirect::to(&format!("{edit_url}?error=unknown_lecturer")))
        }
        Err(err) => {
            error!(?err, publication_id, "failed to update publication");
            Ok(Redirect::to(&format!("{edit_url}?error=unknown")))
        }
    }
}

pub async fn delete_publication(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(publication_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManagePublications).await?;

    match publications::delete_publication(state.pool_ref(), publication_id).await {
        Ok(Some(publication)) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_publication",
                format!("Удалена публикация #{publication_id}: {}", publication.title),
            )
            .await;
            Ok(Redirect::to("/publications?status=publication_deleted"))
        }
        Ok(None) => Ok(Redirect::to("/publications?error=publication_not_found")),
        Err(err) => {
            error!(?err, publication_id, "failed to delete publication");
            Ok(Redirect::to("/publications?error=unknown"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, year: &str, citations: &str) -> PublicationForm {
        PublicationForm {
            title: title.to_string(),
            year: year.to_string(),
            journal: " Вестник ".to_string(),
            source: "Scopus".to_string(),
            link: String::new(),
            citations: citations.to_string(),
            doi: String::new(),
            lecturer_ids: vec![3, 2, 3],
        }
    }

    #[test]
    fn form_trims_and_parses_fields() {
        let fields = form(" Paper X ", "2023", "").fields().expect("valid form");
        assert_eq!(fields.title, "Paper X");
        assert_eq!(fields.year, 2023);
        assert_eq!(fields.journal, "Вестник");
        assert_eq!(fields.citations, 0);
    }

    #[test]
    fn form_reports_first_invalid_field() {
        assert_eq!(form("", "2023", "1").fields().unwrap_err(), "missing_fields");
        assert_eq!(form("Paper", "20x3", "1").fields().unwrap_err(), "invalid_year");
        assert_eq!(form("Paper", "2023", "-4").fields().unwrap_err(), "invalid_count");
    }

    #[test]
    fn authors_fall_back_to_dash() {
        assert_eq!(render_authors(None), "—");
        let names = vec!["A. Ivanov".to_string(), "<B>".to_string()];
        assert_eq!(render_authors(Some(&names)), "A. Ivanov, &lt;B&gt;");
    }
}
