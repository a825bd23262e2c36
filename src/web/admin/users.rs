use std::collections::HashMap;

use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    db::{
        self, LecturerRow, UserRow, audit, lecturers, sessions,
        users::{self, NewUser},
    },
    roles::{Capability, Role},
    validation::is_valid_email,
    web::{
        AppState, AuthUser,
        auth::{hash_password, require},
        escape_html,
        flash::FlashQuery,
        responses::{PageError, PageResult},
        templates::{PageLayout, render_page},
    },
};

#[derive(Deserialize)]
pub struct CreateUserForm {
    fio: String,
    email: String,
    password: String,
    role: String,
    #[serde(default)]
    lecturer_id: String,
}

#[derive(Deserialize)]
pub struct UpdateUserForm {
    fio: String,
    email: String,
    role: String,
    #[serde(default)]
    lecturer_id: String,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    password: String,
}

/// Validated account fields shared by create and update.
#[derive(Debug, PartialEq)]
struct AccountFields {
    fio: String,
    email: String,
    role: Role,
    lecturer_id: Option<i64>,
}

fn parse_account(
    fio: &str,
    email: &str,
    role: &str,
    lecturer_id: &str,
) -> Result<AccountFields, &'static str> {
    let fio = fio.trim();
    let email = email.trim();
    if fio.is_empty() || email.is_empty() {
        return Err("missing_fields");
    }
    if !is_valid_email(email) {
        return Err("invalid_email");
    }
    let role = Role::parse(role).ok_or("invalid_role")?;
    let lecturer_id = match lecturer_id.trim() {
        "" => None,
        raw => Some(raw.parse::<i64>().map_err(|_| "unknown_lecturer")?),
    };

    Ok(AccountFields {
        fio: fio.to_string(),
        email: email.to_string(),
        role,
        lecturer_id,
    })
}

fn role_options(selected: Role) -> String {
    Role::ALL
        .iter()
        .map(|role| {
            let marker = if *role == selected { " selected" } else { "" };
            format!(
                r#"<option value="{value}"{marker}>{label}</option>"#,
                value = role.as_str(),
                label = role.label_ru(),
            )
        })
        .collect()
}

fn lecturer_options(lecturers: &[LecturerRow], selected: Option<i64>) -> String {
    let mut options = String::from(r#"<option value="">—</option>"#);
    for lecturer in lecturers {
        let marker = if selected == Some(lecturer.id) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{id}"{marker}>{fio}</option>"#,
            id = lecturer.id,
            fio = escape_html(&lecturer.fio),
        ));
    }
    options
}

async fn load_lecturers(state: &AppState) -> Result<Vec<LecturerRow>, PageError> {
    lecturers::fetch_lecturers(state.pool_ref())
        .await
        .map_err(|err| {
            error!(?err, "failed to load lecturers for user form");
            PageError::Internal
        })
}

fn render_user_row(user: &UserRow, current: &AuthUser, lecturer_names: &HashMap<i64, &str>) -> String {
    let is_self = user.id == current.id;
    let linked = user
        .lecturer_id
        .and_then(|id| lecturer_names.get(&id))
        .map(|name| escape_html(name))
        .unwrap_or_else(|| "—".to_string());

    let guarded_actions = if is_self {
        String::new()
    } else {
        let block = if user.role() == Role::Blocked {
            String::new()
        } else {
            format!(
                r#"<form class="inline-form" method="post" action="/admin/users/{id}/block"><button type="submit" class="danger">Заблокировать</button></form>"#,
                id = user.id
            )
        };
        format!(
            r#"{block}<form class="inline-form" method="post" action="/admin/users/{id}/delete" onsubmit="return confirm('Удалить пользователя?');"><button type="submit" class="danger">Удалить</button></form>"#,
            id = user.id
        )
    };

    format!(
        r#"<tr><td>{fio}</td><td>{email}</td><td>{role}</td><td>{linked}</td><td>{created}</td><td class="actions"><a href="/admin/users/{id}/edit">Изменить</a>{guarded_actions}</td></tr>"#,
        id = user.id,
        fio = escape_html(&user.fio),
        email = escape_html(&user.email),
        role = user.role().label_ru(),
        created = user.created_at.format("%d.%m.%Y"),
    )
}

pub async fn users_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;

    let accounts = users::fetch_users(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to list users");
        PageError::Internal
    })?;
    let all_lecturers = load_lecturers(&state).await?;
    let lecturer_names: HashMap<i64, &str> = all_lecturers
        .iter()
        .map(|lecturer| (lecturer.id, lecturer.fio.as_str()))
        .collect();

    let rows: String = accounts
        .iter()
        .map(|user| render_user_row(user, &admin, &lecturer_names))
        .collect();

    let body = format!(
        r#"<section class="panel"><h2>Учётные записи</h2><table><thead><tr><th>ФИО</th><th>Email</th><th>Роль</th><th>Преподаватель</th><th>Создан</th><th>Действия</th></tr></thead><tbody>{rows}</tbody></table></section>
<section class="panel"><h2>Новый пользователь</h2><form method="post" action="/admin/users">
    <label for="fio">ФИО *</label><input id="fio" name="fio" required>
    <label for="email">Email *</label><input id="email" type="email" name="email" required>
    <label for="password">Пароль *</label><input id="password" type="password" name="password" required>
    <label for="role">Роль</label><select id="role" name="role">{roles}</select>
    <label for="lecturer_id">Карточка преподавателя</label><select id="lecturer_id" name="lecturer_id">{lecturers}</select>
    <button type="submit">Создать</button>
</form></section>"#,
        roles = role_options(Role::Staff),
        lecturers = lecturer_options(&all_lecturers, None),
    );

    Ok(Html(render_page(
        PageLayout::new("Пользователи", Some(&admin), body).with_flash(params.render()),
    )))
}

pub async fn create_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CreateUserForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;

    let fields = match parse_account(&form.fio, &form.email, &form.role, &form.lecturer_id) {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("/admin/users?error={code}"))),
    };

    let password = form.password.trim();
    if password.is_empty() {
        return Ok(Redirect::to("/admin/users?error=missing_password"));
    }

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(?err, "failed to hash password while creating user");
            return Ok(Redirect::to("/admin/users?error=hash_failed"));
        }
    };

    let result = users::create_user(
        state.pool_ref(),
        &NewUser {
            fio: &fields.fio,
            email: &fields.email,
            password_hash: &password_hash,
            role: fields.role,
            lecturer_id: fields.lecturer_id,
        },
    )
    .await;

    match result {
        Ok(user_id) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "create_user",
                format!("Создан пользователь #{user_id}: {} ({})", fields.email, fields.role.as_str()),
            )
            .await;
            Ok(Redirect::to("/admin/users?status=user_created"))
        }
        Err(err) if db::is_unique_violation(&err) => {
            Ok(Redirect::to("/admin/users?error=duplicate_email"))
        }
        Err(err) if db::is_foreign_key_violation(&err) => {
            Ok(Redirect::to("/admin/users?error=unknown_lecturer"))
        }
        Err(err) => {
            error!(?err, "failed to create user");
            Ok(Redirect::to("/admin/users?error=unknown"))
        }
    }
}

pub async fn edit_user_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Query(params): Query<FlashQuery>,
) -> PageResult {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;

    let user = match users::fetch_user(state.pool_ref(), user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(PageError::NotFound),
        Err(err) => {
            error!(?err, user_id, "failed to load user");
            return Err(PageError::Internal);
        }
    };
    let all_lecturers = load_lecturers(&state).await?;

    let body = format!(
        r#"<section class="panel"><form method="post" action="/admin/users/{user_id}/edit">
    <label for="fio">ФИО *</label><input id="fio" name="fio" value="{fio}" required>
    <label for="email">Email *</label><input id="email" type="email" name="email" value="{email}" required>
    <label for="role">Роль</label><select id="role" name="role">{roles}</select>
    <label for="lecturer_id">Карточка преподавателя</label><select id="lecturer_id" name="lecturer_id">{lecturers}</select>
    <button type="submit">Сохранить</button>
</form></section>
<section class="panel"><h2>Новый пароль</h2><form method="post" action="/admin/users/{user_id}/password">
    <label for="password">Пароль *</label><input id="password" type="password" name="password" required>
    <button type="submit">Сменить пароль</button>
</form></section>"#,
        fio = escape_html(&user.fio),
        email = escape_html(&user.email),
        roles = role_options(user.role()),
        lecturers = lecturer_options(&all_lecturers, user.lecturer_id),
    );

    Ok(Html(render_page(
        PageLayout::new("Редактирование пользователя", Some(&admin), body)
            .with_flash(params.render()),
    )))
}

pub async fn update_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Form(form): Form<UpdateUserForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;
    let edit_url = format!("/admin/users/{user_id}/edit");

    let fields = match parse_account(&form.fio, &form.email, &form.role, &form.lecturer_id) {
        Ok(fields) => fields,
        Err(code) => return Ok(Redirect::to(&format!("{edit_url}?error={code}"))),
    };

    if user_id == admin.id && fields.role != Role::Admin {
        return Ok(Redirect::to(&format!("{edit_url}?error=self_action")));
    }

    let result = users::update_user(
        state.pool_ref(),
        user_id,
        &fields.fio,
        &fields.email,
        fields.role,
        fields.lecturer_id,
    )
    .await;

    match result {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "update_user",
                format!("Обновлён пользователь #{user_id}: {} ({})", fields.email, fields.role.as_str()),
            )
            .await;
            Ok(Redirect::to("/admin/users?status=user_updated"))
        }
        Ok(false) => Ok(Redirect::to("/admin/users?error=user_not_found")),
        Err(err) if db::is_unique_violation(&err) => {
            Ok(Redirect::to(&format!("{edit_url}?error=duplicate_email")))
        }
        Err(err) if db::is_foreign_key_violation(&err) => {
            Ok(Redirect::to(&format!("{edit_url}?error=unknown_lecturer")))
        }
        Err(err) => {
            error!(?err, user_id, "failed to update user");
            Ok(Redirect::to(&format!("{edit_url}?error=unknown")))
        }
    }
}

pub async fn block_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;

    if user_id == admin.id {
        return Ok(Redirect::to("/admin/users?error=self_action"));
    }

    match users::set_role(state.pool_ref(), user_id, Role::Blocked).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "block_user",
                format!("Заблокирован пользователь #{user_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/users?status=user_blocked"))
        }
        Ok(false) => Ok(Redirect::to("/admin/users?error=user_not_found")),
        Err(err) => {
            error!(?err, user_id, "failed to block user");
            Ok(Redirect::to("/admin/users?error=unknown"))
        }
    }
}

pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;
    let edit_url = format!("/admin/users/{user_id}/edit");

    let password = form.password.trim();
    if password.is_empty() {
        return Ok(Redirect::to(&format!("{edit_url}?error=missing_password")));
    }

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(?err, "failed to hash password while resetting user password");
            return Ok(Redirect::to(&format!("{edit_url}?error=hash_failed")));
        }
    };

    match users::update_password(state.pool_ref(), user_id, &password_hash).await {
        Ok(true) => {
            if user_id != admin.id {
                match sessions::delete_user_sessions(state.pool_ref(), user_id).await {
                    Ok(ended) => info!(user_id, ended, "sessions ended after password reset"),
                    Err(err) => error!(?err, user_id, "failed to end sessions after password reset"),
                }
            }
            audit::record(
                state.pool_ref(),
                admin.id,
                "reset_password",
                format!("Сброшен пароль пользователя #{user_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/users?status=password_updated"))
        }
        Ok(false) => Ok(Redirect::to("/admin/users?error=user_not_found")),
        Err(err) => {
            error!(?err, user_id, "failed to update user password");
            Ok(Redirect::to(&format!("{edit_url}?error=unknown")))
        }
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Redirect, Redirect> {
    let admin = require(&state, &jar, Capability::ManageUsers).await?;

    if user_id == admin.id {
        return Ok(Redirect::to("/admin/users?error=self_action"));
    }

    match users::delete_user(state.pool_ref(), user_id).await {
        Ok(true) => {
            audit::record(
                state.pool_ref(),
                admin.id,
                "delete_user",
                format!("Удалён пользователь #{user_id}"),
            )
            .await;
            Ok(Redirect::to("/admin/users?status=user_deleted"))
        }
        Ok(false) => Ok(Redirect::to("/admin/users?error=user_not_found")),
        Err(err) => {
            error!(?err, user_id, "failed to delete user");
            Ok(Redirect::to("/admin/users?error=unknown"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_fields_parse_role_and_optional_lecturer() {
        let fields = parse_account(" Петрова ", "petrova@university.ru", "lecturer", "2").unwrap();
        assert_eq!(
            fields,
            AccountFields {
                fio: "Петрова".to_string(),
                email: "petrova@university.ru".to_string(),
                role: Role::Lecturer,
                lecturer_id: Some(2),
            }
        );

        let fields = parse_account("Staff", "staff@university.ru", "staff", "").unwrap();
        assert_eq!(fields.lecturer_id, None);
    }

    #[test]
    fn account_fields_reject_bad_input() {
        assert_eq!(parse_account("", "a@b.ru", "staff", "").unwrap_err(), "missing_fields");
        assert_eq!(parse_account("A", "a-b.ru", "staff", "").unwrap_err(), "invalid_email");
        assert_eq!(parse_account("A", "a@b.ru", "root", "").unwrap_err(), "invalid_role");
        assert_eq!(parse_account("A", "a@b.ru", "staff", "x").unwrap_err(), "unknown_lecturer");
    }

    #[test]
    fn role_options_mark_selection() {
        let html = role_options(Role::Blocked);
        assert!(html.contains(r#"<option value="blocked" selected>"#));
        assert!(html.contains(r#"<option value="admin">"#));
    }
}
