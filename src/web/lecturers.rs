use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use crate::{
    db::{
        self, LecturerRow, MetricRow, PublicationRow, audit,
        lecturers::{self, LecturerFields},
        metrics::{self, MetricValues},
        publications,
    },
    roles::Capability,
    validation::{is_valid_email, parse_count, parse_year},
    web::{
        AppState,
        auth::{current_user, require},
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_link, render_page, status_badge},
    },
};

#[derive(Deserialize)]
pub struct LecturerForm {
    fio: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    academic_degree: String,
    #[serde(default)]
    orcid: String,
    #[serde(default)]
    email: String,
}

impl LecturerForm {
    fn validate(&self) -> Result<LecturerFields, &'static str> {
        let fio = self.fio.trim();
        if fio.is_empty() {
            return Err("missing_fields");
        }
        let email = self.email.trim();
        if !email.is_empty() && !is_valid_email(email) {
            return Err("invalid_email");
        }

        Ok(LecturerFields {
            fio: fio.to_string(),
            position: self.position.trim().to_string(),
            department: self.department.trim().to_string(),
            academic_degree: self.academic_degree.trim().to_string(),
            orcid: self.orcid.trim().to_string(),
            email: email.to_string(),
        })
    }
}

#[derive(Deserialize)]
pub struct MetricsForm {
    year: String,
    #[serde(default)]
    total_publications: String,
    #[serde(default)]
    total_citations: String,
    #[serde(default)]
    h_index: String,
    #[serde(default)]
    rinc: String,
    #[serde(default)]
    scopus: String,
    #[serde(default)]
    wos: String,
    #[serde(default)]
    google_scholar: String,
}

impl MetricsForm {
    fn validate(&self) -> Result<(i32, MetricValues), &'static str> {
        let year = parse_year(&self.year).ok_or("invalid_year")?;
        let count = |raw: &str| parse_count(raw).ok_or("invalid_count");

        Ok((
            year,
            MetricValues {
                total_publications: count(&self.total_publications)?,
                total_citations: count(&self.total_citations)?,
                h_index: count(&self.h_index)?,
                rinc: count(&self.rinc)?,
                scopus: count(&self.scopus)?,
                wos: count(&self.wos)?,
                google_scholar: count(&self.google_scholar)?,
            },
        ))
    }
}

async fn load_lecturer(state: &AppState, lecturer_id: i64) -> Result<LecturerRow, PageError> {
    match lecturers::fetch_lecturer(state.pool_ref(), lecturer_id).await {
        Ok(Some(lecturer)) => Ok(lecturer),
        Ok(None) => Err(PageError::NotFound),
        Err(err) => {
            error!(?err, lecturer_id, "failed to load lecturer");
            Err(PageError::Internal)
        }
    }
}

pub async fn list_lecturers(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = current_user(&state, &jar).await;
    let can_manage = user
        .as_ref()
        .is_some_and(|user| user.can(Capability::ManageLecturers));

    let rows = lecturers::fetch_lecturers(state.pool_ref())
        .await
        .map_err(|err| {
            error!(?err, "failed to list lecturers");
            PageError::Internal
        })?;

    let mut table_rows = String::new();
    if rows.is_empty() {
        table_rows.push_str(r#"<tr><td colspan="5">Преподаватели пока не добавлены.</td></tr>"#);
    }
    for lecturer in &rows {
        let actions = if can_manage {
            format!(
                r#"<td class="actions"><a href="/lecturers/{id}/edit">Изменить</a><a href="/lecturers/{id}/metrics">Показатели</a><form class="inline-form" method="post" action="/lecturers/{id}/delete" onsubmit="return confirm('Удалить преподавателя вместе с показателями?');"><button type="submit" class="danger">Удалить</button></form></td>"#,
                id = lecturer.id
            )
        } else {
            String::new()
        };
        table_rows.push_str(&format!(
            r#"<tr><td><a href="/lecturers/{id}">{fio}</a></td><td>{position}</td><td>{department}</td><td>{degree}</td>{actions}</tr>"#,
            id = lecturer.id,
            fio = escape_html(&lecturer.fio),
            position = escape_html(&lecturer.position),
            department = escape_html(&lecturer.department),
            degree = escape_html(&lecturer.academic_degree),
        ));
    }

    let (add_link, actions_header) = if can_manage {
        (
            r#"<p><a href="/lecturers/new">+ Добавить преподавателя</a></p>"#,
            "<th>Действия</th>",
        )
    } else {
        ("", "")
    };

    let body = format!(
        r#"<section class="panel">{add_link}<table><thead><tr><th>ФИО</th><th>Должность</th><th>Кафедра</th><th>Учёная степень</th>{actions_header}</tr></thead><tbody>{table_rows}</tbody></table></section>"#
    );

    Ok(Html(render_page(
        PageLayout::new("Преподаватели", user.as_ref(), body).with_flash(params.render()),
    )))
}

pub async fn lecturer_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = current_user(&state, &jar).await;
    let lecturer = load_lecturer(&state, lecturer_id).await?;
    let pool = state.pool_ref();

    let publications = publications::fetch_publications_by_lecturer(pool, lecturer_id)
        .await
        .map_err(|err| {
            error!(?err, lecturer_id, "failed to load lecturer publications");
            PageError::Internal
        })?;
    let metric_rows = metrics::fetch_metrics_by_lecturer(pool, lecturer_id)
        .await
        .map_err(|err| {
            error!(?err, lecturer_id, "failed to load lecturer metrics");
            PageError::Internal
        })?;

    let can_edit_metrics = user
        .as_ref()
        .is_some_and(|user| user.can(Capability::EditMetrics));

    let body = format!(
        "{details}{publications}{metrics}",
        details = render_lecturer_details(&lecturer),
        publications = render_publication_table(&publications),
        metrics = render_metrics_table(&metric_rows, can_edit_metrics.then_some(lecturer_id)),
    );

    Ok(Html(render_page(
        PageLayout::new(&lecturer.fio, user.as_ref(), body).with_flash(params.render()),
    )))
}

fn render_lecturer_details(lecturer: &LecturerRow) -> String {
    let orcid = if lecturer.orcid.is_empty() {
        "—".to_string()
    } else {
        let orcid = escape_html(&lecturer.orcid);
        format!(r#"<a href="https://orcid.org/{orcid}" target="_blank" rel="noopener">{orcid}</a>"#)
    };
    format!(
        r#"<section class="panel"><h2>Профиль</h2><table><tbody><tr><th>Должность</th><td>{position}</td></tr><tr><th>Кафедра</th><td>{department}</td></tr><tr><th>Учёная степень</th><td>{degree}</td></tr><tr><th>ORCID</th><td>{orcid}</td></tr><tr><th>Email</th><td>{email}</td></tr></tbody></table></section>"#,
        position = escape_html(&lecturer.position),
        department = escape_html(&lecturer.department),
        degree = escape_html(&lecturer.academic_degree),
        email = escape_html(&lecturer.email),
    )
}

fn render_publication_table(publications: &[PublicationRow]) -> String {
    if publications.is_empty() {
        return r#"<section class="panel"><h2>Публикации</h2><p class="note">Публикаций пока нет.</p></section>"#.to_string();
    }

    let rows: String = publications
        .iter()
        .map(|publication| {
            format!(
                "<tr><td>{title}</td><td>{year}</td><td>{journal}</td><td>{citations}</td><td>{link}</td><td>{status}</td></tr>",
                title = escape_html(&publication.title),
                year = publication.year,
                journal = escape_html(&publication.journal),
                citations = publication.citations,
                link = render_link(&publication.link),
                status = status_badge(publication.status()),
            )
        })
        .collect();

    format!(
        r#"<section class="panel"><h2>Публикации</h2><table><thead><tr><th>Название</th><th>Год</th><th>Журнал</th><th>Цитирования</th><th>Ссылка</th><th>Статус</th></tr></thead><tbody>{rows}</tbody></table></section>"#
    )
}

fn render_metrics_table(rows: &[MetricRow], edit_for: Option<i64>) -> String {
    let edit_link = edit_for
        .map(|id| format!(r#"<p><a href="/lecturers/{id}/metrics">Внести показатели</a></p>"#))
        .unwrap_or_default();

    if rows.is_empty() {
        return format!(
            r#"<section class="panel"><h2>Показатели</h2><p class="note">Показатели ещё не внесены.</p>{edit_link}</section>"#
        );
    }

    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.year,
                row.total_publications,
                row.total_citations,
                row.h_index,
                row.rinc,
                row.scopus,
                row.wos,
                row.google_scholar,
            )
        })
        .collect();

    format!(
        r#"<section class="panel"><h2>Показатели</h2>{edit_link}<table><thead><tr><th>Год</th><th>Публикаций</th><th>Цитирований</th><th>h-индекс</th><th>РИНЦ</th><th>Scopus</th><th>WoS</th><th>Google Scholar</th></tr></thead><tbody>{body}</tbody></table></section>"#
    )
}

fn render_lecturer_form(action: &str, lecturer: Option<&LecturerRow>, submit_label: &str) -> String {
    let row = lecturer.cloned().unwrap_or_default();

    format!(
        r#"<section class="panel"><form method="post" action="{action}">
    <label for="fio">ФИО *</label><input id="fio" name="fio" value="{fio}" required>
    <label for="position">Должность</label><input id="position" name="position" value="{position}">
    <label for="department">Кафедра</label><input id="department" name="department" value="{department}">
    <label for="academic_degree">Учёная степень</label><input id="academic_degree" name="academic_degree" value="{degree}">
    <label for="orcid">ORCID</label><input id="orcid" name="orcid" value="{orcid}">
    <label for="email">Email</label><input id="email" type="email" name="email" value="{email}">
    <button type="submit">{submit_label}</button>
</form></section>"#,
        fio = escape_html(&row.fio),
        position = escape_html(&row.position),
        department = escape_html(&row.department),
        degree = escape_html(&row.academic_degree),
        orcid = escape_html(&row.orcid),
        email = escape_html(&row.email),
    )
}

pub async fn new_lecturer_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ManageLecturers).await?;
    let body = render_lecturer_form("/lecturers/new", None, "Добавить");
    Ok(Html(render_page(
        PageLayout::new("Новый преподаватель", Some(&user), body).with_flash(params.render()),
    )))
}

pub async fn create_lecturer(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LecturerForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageLecturers).await?;

    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("/lecturers/new?error={code}"))),
    };

    match lecturers::create_lecturer(state.pool_ref(), &fields).await {
        Ok(lecturer_id) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "create_lecturer",
                format!("Добавлен преподаватель #{lecturer_id}: {}", fields.fio),
            )
            .await;
            Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}?status=lecturer_created"
            )))
        }
        Err(err) => {
            error!(?err, "failed to create lecturer");
            Ok(Redirect::to("/lecturers/new?error=unknown"))
        }
    }
}

pub async fn edit_lecturer_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::ManageLecturers).await?;
    let lecturer = load_lecturer(&state, lecturer_id).await?;

    let body = render_lecturer_form(
        &format!("/lecturers/{lecturer_id}/edit"),
        Some(&lecturer),
        "Сохранить",
    );
    Ok(Html(render_page(
        PageLayout::new("Редактирование преподавателя", Some(&user), body)
            .with_flash(params.render()),
    )))
}

pub async fn update_lecturer(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
    Form(form): Form<LecturerForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageLecturers).await?;

    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(code) => {
            return Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}/edit?error={code}"
            )));
        }
    };

    match lecturers::update_lecturer(state.pool_ref(), lecturer_id, &fields).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "update_lecturer",
                format!("Обновлён преподаватель #{lecturer_id}: {}", fields.fio),
            )
            .await;
            Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}?status=lecturer_updated"
            )))
        }
        Ok(false) => Ok(Redirect::to("/lecturers?error=lecturer_not_found")),
        Err(err) => {
            error!(?err, lecturer_id, "failed to update lecturer");
            Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}/edit?error=unknown"
            )))
        }
    }
}

pub async fn delete_lecturer(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageLecturers).await?;

    match lecturers::delete_lecturer(state.pool_ref(), lecturer_id).await {
        Ok(Some(lecturer)) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_lecturer",
                format!("Удалён преподаватель #{lecturer_id}: {}", lecturer.fio),
            )
            .await;
            Ok(Redirect::to("/lecturers?status=lecturer_deleted"))
        }
        Ok(None) => Ok(Redirect::to("/lecturers?error=lecturer_not_found")),
        Err(err) => {
            error!(?err, lecturer_id, "failed to delete lecturer");
            Ok(Redirect::to("/lecturers?error=unknown"))
        }
    }
}

pub async fn metrics_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let user = require(&state, &jar, Capability::EditMetrics).await?;
    let lecturer = load_lecturer(&state, lecturer_id).await?;

    let history = metrics::fetch_metrics_by_lecturer(state.pool_ref(), lecturer_id)
        .await
        .map_err(|err| {
            error!(?err, lecturer_id, "failed to load metrics history");
            PageError::Internal
        })?;

    let body = format!(
        r#"<section class="panel"><h2>{fio}</h2><p class="note">Повторное сохранение за тот же год перезаписывает показатели.</p><form method="post" action="/lecturers/{lecturer_id}/metrics">
    <label for="year">Год *</label><input id="year" name="year" inputmode="numeric" required>
    <label for="total_publications">Всего публикаций</label><input id="total_publications" name="total_publications" value="0">
    <label for="total_citations">Всего цитирований</label><input id="total_citations" name="total_citations" value="0">
    <label for="h_index">h-индекс</label><input id="h_index" name="h_index" value="0">
    <label for="rinc">РИНЦ</label><input id="rinc" name="rinc" value="0">
    <label for="scopus">Scopus</label><input id="scopus" name="scopus" value="0">
    <label for="wos">WoS</label><input id="wos" name="wos" value="0">
    <label for="google_scholar">Google Scholar</label><input id="google_scholar" name="google_scholar" value="0">
    <button type="submit">Сохранить</button>
</form></section>{history}"#,
        fio = escape_html(&lecturer.fio),
        history = render_metrics_table(&history, None),
    );

    Ok(Html(render_page(
        PageLayout::new("Показатели преподавателя", Some(&user), body)
            .with_flash(params.render()),
    )))
}

pub async fn save_metrics(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(lecturer_id): Path<i64>,
    Form(form): Form<MetricsForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::EditMetrics).await?;

    let (year, values) = match form.validate() {
        Ok(parsed) => parsed,
        Err(code) => {
            return Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}/metrics?error={code}"
            )));
        }
    };

    match metrics::set_metrics(state.pool_ref(), lecturer_id, year, &values).await {
        Ok(_) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "set_metrics",
                format!("Показатели преподавателя #{lecturer_id} за {year}"),
            )
            .await;
            Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}?status=metrics_saved"
            )))
        }
        Err(err) if db::is_foreign_key_violation(&err) => {
            Ok(Redirect::to("/lecturers?error=unknown_lecturer"))
        }
        Err(err) => {
            error!(?err, lecturer_id, year, "failed to save metrics");
            Ok(Redirect::to(&format!(
                "/lecturers/{lecturer_id}/metrics?error=unknown"
            )))
        }
    }
}

/// Checkbox list of lecturers, ticking the ones in `selected`.
pub fn render_lecturer_checkboxes(lecturers: &[LecturerRow], selected: &[i64]) -> String {
    if lecturers.is_empty() {
        return r#"<p class="note">Сначала добавьте преподавателей.</p>"#.to_string();
    }

    let items: String = lecturers
        .iter()
        .map(|lecturer| {
            let checked = if selected.contains(&lecturer.id) {
                " checked"
            } else {
                ""
            };
            format!(
                r#"<label><input type="checkbox" name="lecturer_ids" value="{id}"{checked}>{fio}</label>"#,
                id = lecturer.id,
                fio = escape_html(&lecturer.fio),
            )
        })
        .collect();
    format!(r#"<div class="checkbox-list">{items}</div>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_form(year: &str, h_index: &str) -> MetricsForm {
        MetricsForm {
            year: year.to_string(),
            total_publications: "4".to_string(),
            total_citations: String::new(),
            h_index: h_index.to_string(),
            rinc: "1".to_string(),
            scopus: "0".to_string(),
            wos: "0".to_string(),
            google_scholar: "3".to_string(),
        }
    }

    #[test]
    fn metrics_form_parses_counts_and_defaults_blank_to_zero() {
        let (year, values) = metrics_form("2023", "2").validate().expect("valid form");
        assert_eq!(year, 2023);
        assert_eq!(values.total_publications, 4);
        assert_eq!(values.total_citations, 0);
        assert_eq!(values.h_index, 2);
        assert_eq!(values.google_scholar, 3);
    }

    #[test]
    fn metrics_form_rejects_bad_year_and_negative_counts() {
        assert_eq!(metrics_form("1850", "1").validate().unwrap_err(), "invalid_year");
        assert_eq!(metrics_form("2023", "-2").validate().unwrap_err(), "invalid_count");
    }

    #[test]
    fn lecturer_form_requires_name_and_valid_email() {
        let form = LecturerForm {
            fio: "  ".to_string(),
            position: String::new(),
            department: String::new(),
            academic_degree: String::new(),
            orcid: String::new(),
            email: String::new(),
        };
        assert_eq!(form.validate().unwrap_err(), "missing_fields");

        let form = LecturerForm {
            fio: "A. Ivanov".to_string(),
            email: "ivanov".to_string(),
            ..form
        };
        assert_eq!(form.validate().unwrap_err(), "invalid_email");
    }

    #[test]
    fn checkboxes_mark_selected_lecturers() {
        let lecturer = |id: i64, fio: &str| LecturerRow {
            id,
            fio: fio.to_string(),
            position: String::new(),
            department: String::new(),
            academic_degree: String::new(),
            orcid: String::new(),
            email: String::new(),
        };
        let html = render_lecturer_checkboxes(&[lecturer(2, "Петрова"), lecturer(3, "Сидоров")], &[3]);
        assert!(html.contains(r#"value="2">Петрова"#));
        assert!(html.contains(r#"value="3" checked>Сидоров"#));
    }
}
