use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::{audit, sessions, sessions::SessionUserRow, users},
    roles::{AccessDenied, Actor, Capability, Role, authorize},
};

use super::{
    AppState,
    flash::{FlashQuery, compose_flash_message},
    templates::render_login_page,
};

pub const SESSION_COOKIE: &str = "session_token";

/// The signed-in user behind the session cookie.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub fio: String,
    pub email: String,
    pub role: Role,
    pub lecturer_id: Option<i64>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}

impl From<SessionUserRow> for AuthUser {
    fn from(row: SessionUserRow) -> Self {
        Self {
            role: Role::from_stored(&row.role),
            id: row.id,
            fio: row.fio,
            email: row.email,
            lecturer_id: row.lecturer_id,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> Result<Html<String>, Redirect> {
    if current_user(&state, &jar).await.is_some() {
        return Err(Redirect::to("/dashboard"));
    }

    Ok(Html(render_login_page(&params.render())))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let email = form.email.trim();
    let pool = state.pool_ref();

    let user = match users::fetch_user_by_email(pool, email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(invalid_credentials()),
        Err(err) => {
            error!(?err, "failed to fetch user during login");
            return Err(server_error());
        }
    };

    if !verify_password(&form.password, &user.password_hash) {
        return Err(invalid_credentials());
    }

    if user.role() == Role::Blocked {
        warn!(user_id = user.id, "blocked user attempted to log in");
        return Err(invalid_credentials());
    }

    match sessions::purge_expired(pool).await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "removed expired sessions"),
        Err(err) => error!(?err, "failed to purge expired sessions"),
    }

    let ttl_days = state.config().session_ttl_days;
    let session_token = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::days(ttl_days);

    if let Err(err) = sessions::create_session(pool, session_token, user.id, expires_at).await {
        error!(?err, "failed to create session");
        return Err(server_error());
    }

    audit::record(pool, user.id, "login", format!("Вход пользователя {}", user.email)).await;

    let mut cookie = Cookie::new(SESSION_COOKIE, session_token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(ttl_days));

    let jar = jar.add(cookie);
    Ok((jar, Redirect::to("/dashboard")))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut jar = jar;

    if let Some(token) = session_token(&jar) {
        let pool = state.pool_ref();
        match sessions::fetch_session_user(pool, token).await {
            Ok(Some(user)) => {
                audit::record(pool, user.id, "logout", format!("Выход пользователя {}", user.email)).await;
            }
            Ok(None) => {}
            Err(err) => error!(?err, "failed to resolve session during logout"),
        }
        if let Err(err) = sessions::delete_session(pool, token).await {
            error!(?err, "failed to remove session during logout");
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    (jar, Redirect::to("/login?status=logged_out"))
}

fn session_token(jar: &CookieJar) -> Option<Uuid> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok()
}

/// Resolves the session cookie. Storage failures are logged and read as anonymous.
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<AuthUser> {
    let token = session_token(jar)?;

    match sessions::fetch_session_user(state.pool_ref(), token).await {
        Ok(row) => row.map(AuthUser::from),
        Err(err) => {
            error!(?err, "failed to resolve session");
            None
        }
    }
}

/// Loads the session user and checks one capability.
pub async fn require(
    state: &AppState,
    jar: &CookieJar,
    capability: Capability,
) -> Result<AuthUser, Redirect> {
    let user = current_user(state, jar).await;
    let actor = user.as_ref().map(AuthUser::actor);

    match authorize(actor.as_ref(), capability) {
        Ok(()) => user.ok_or_else(|| Redirect::to("/login")),
        Err(denied) => Err(denied_redirect(denied)),
    }
}

pub fn denied_redirect(denied: AccessDenied) -> Redirect {
    match denied {
        AccessDenied::NotAuthenticated => Redirect::to("/login"),
        AccessDenied::Forbidden { .. } => Redirect::to("/dashboard?error=not_authorized"),
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn invalid_credentials() -> (StatusCode, Html<String>) {
    (
        StatusCode::UNAUTHORIZED,
        Html(render_login_page(&compose_flash_message(
            None,
            Some("invalid_credentials"),
        ))),
    )
}

fn server_error() -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_login_page(&compose_flash_message(None, Some("unknown")))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_original() {
        let hash = hash_password("s3cret").expect("hash");
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn denied_redirects_point_to_login_or_dashboard() {
        let login = denied_redirect(AccessDenied::NotAuthenticated);
        let forbidden = denied_redirect(AccessDenied::Forbidden {
            role: Role::Lecturer,
            capability: Capability::ManageUsers,
        });
        assert_eq!(location(login), "/login");
        assert_eq!(location(forbidden), "/dashboard?error=not_authorized");
    }

    fn location(redirect: Redirect) -> String {
        use axum::response::IntoResponse;
        redirect
            .into_response()
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn session_row_decodes_unknown_role_as_blocked() {
        let user = AuthUser::from(SessionUserRow {
            id: 3,
            fio: "Сидоров".into(),
            email: "sidorov@university.ru".into(),
            role: "root".into(),
            lecturer_id: Some(3),
        });
        assert_eq!(user.role, Role::Blocked);
        assert_eq!(user.actor(), Actor { user_id: 3, role: Role::Blocked });
    }
}
