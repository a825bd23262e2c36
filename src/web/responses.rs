use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::templates::render_message_page;

/// Failure outcomes of an HTML page handler.
#[derive(Debug)]
pub enum PageError {
    Redirect(Redirect),
    NotFound,
    Internal,
}

pub type PageResult = Result<Html<String>, PageError>;

impl From<Redirect> for PageError {
    fn from(redirect: Redirect) -> Self {
        PageError::Redirect(redirect)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Redirect(redirect) => redirect.into_response(),
            PageError::NotFound => (
                StatusCode::NOT_FOUND,
                Html(render_message_page(
                    "Не найдено",
                    "Запрошенная запись не существует или была удалена.",
                )),
            )
                .into_response(),
            PageError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_message_page(
                    "Ошибка сервера",
                    "Не удалось выполнить запрос. Попробуйте позже.",
                )),
            )
                .into_response(),
        }
    }
}
