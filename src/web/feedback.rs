use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    db::content,
    validation::is_valid_email,
    web::{
        AppState, AuthUser,
        auth::current_user,
        escape_html,
        flash::FlashQuery,
        templates::{PageLayout, render_page},
    },
};

#[derive(Default, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
}

impl FeedbackForm {
    fn validation_errors(&self) -> Vec<&'static str> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Введите имя.");
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.push("Введите email.");
        } else if !is_valid_email(email) {
            errors.push("Некорректный email.");
        }
        if self.message.trim().is_empty() {
            errors.push("Введите сообщение.");
        }
        errors
    }
}

fn render_feedback_page(user: Option<&AuthUser>, form: &FeedbackForm, flash_html: String) -> String {
    let body = format!(
        r#"<section class="panel"><p class="note">Вопросы и предложения по работе портала.</p><form method="post" action="/feedback">
    <label for="name">Имя *</label><input id="name" name="name" value="{name}" required>
    <label for="email">Email *</label><input id="email" type="email" name="email" value="{email}" required>
    <label for="message">Сообщение *</label><textarea id="message" name="message" rows="6" required>{message}</textarea>
    <button type="submit">Отправить</button>
</form></section>"#,
        name = escape_html(&form.name),
        email = escape_html(&form.email),
        message = escape_html(&form.message),
    );
    render_page(PageLayout::new("Обратная связь", user, body).with_flash(flash_html))
}

pub async fn feedback_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FlashQuery>,
) -> Html<String> {
    let user = current_user(&state, &jar).await;
    Html(render_feedback_page(
        user.as_ref(),
        &FeedbackForm::default(),
        params.render(),
    ))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let errors = form.validation_errors();
    if !errors.is_empty() {
        let user = current_user(&state, &jar).await;
        let items: String = errors.iter().map(|text| format!("<li>{text}</li>")).collect();
        let flash = format!(r#"<div class="flash error"><ul>{items}</ul></div>"#);
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(render_feedback_page(user.as_ref(), &form, flash)),
        ));
    }

    match content::create_feedback(
        state.pool_ref(),
        form.name.trim(),
        form.email.trim(),
        form.message.trim(),
    )
    .await
    {
        Ok(feedback_id) => {
            info!(feedback_id, "feedback received");
            Ok(Redirect::to("/feedback?status=feedback_sent"))
        }
        Err(err) => {
            error!(?err, "failed to store feedback");
            Ok(Redirect::to("/feedback?error=unknown"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> FeedbackForm {
        FeedbackForm {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn empty_message_is_reported() {
        let errors = form("Анна", "anna@example.com", "   ").validation_errors();
        assert_eq!(errors, vec!["Введите сообщение."]);
    }

    #[test]
    fn bad_email_and_missing_name_are_reported_together() {
        let errors = form("", "anna", "Вопрос").validation_errors();
        assert_eq!(errors, vec!["Введите имя.", "Некорректный email."]);
    }

    #[test]
    fn blank_email_is_reported() {
        let errors = form("Анна", "  ", "Вопрос").validation_errors();
        assert_eq!(errors, vec!["Введите email."]);
    }

    #[test]
    fn complete_form_passes() {
        assert!(form("Анна", "anna@example.com", "Вопрос").validation_errors().is_empty());
    }

    #[test]
    fn rerender_keeps_entered_values_escaped() {
        let html = render_feedback_page(None, &form("<Анна>", "", ""), String::new());
        assert!(html.contains(r#"value="&lt;Анна&gt;""#));
    }
}
