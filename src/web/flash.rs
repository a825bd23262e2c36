use serde::Deserialize;

/// `?status=` / `?error=` pair carried by redirects.
#[derive(Default, Deserialize)]
pub struct FlashQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

impl FlashQuery {
    pub fn render(&self) -> String {
        compose_flash_message(self.status.as_deref(), self.error.as_deref())
    }
}

fn status_message(status: &str) -> &'static str {
    match status {
        "logged_out" => "Вы вышли из системы.",
        "lecturer_created" => "Преподаватель добавлен.",
        "lecturer_updated" => "Данные преподавателя обновлены.",
        "lecturer_deleted" => "Преподаватель удалён.",
        "publication_created" => "Публикация добавлена.",
        "publication_updated" => "Публикация обновлена.",
        "publication_deleted" => "Публикация удалена.",
        "submitted" => "Публикация отправлена на проверку.",
        "metrics_saved" => "Показатели сохранены.",
        "approved" => "Публикация одобрена.",
        "rejected" => "Публикация отклонена.",
        "revision" => "Публикация отправлена на доработку.",
        "user_created" => "Пользователь создан.",
        "user_updated" => "Пользователь обновлён.",
        "user_blocked" => "Пользователь заблокирован.",
        "password_updated" => "Пароль обновлён.",
        "user_deleted" => "Пользователь удалён.",
        "feedback_sent" => "Спасибо! Сообщение отправлено.",
        "feedback_deleted" => "Сообщение удалено.",
        "news_created" => "Новость опубликована.",
        "news_deleted" => "Новость удалена.",
        "faq_created" => "Вопрос добавлен.",
        "faq_deleted" => "Вопрос удалён.",
        _ => "",
    }
}

fn error_message(error: &str) -> &'static str {
    match error {
        "not_authorized" => "Недостаточно прав для этого действия.",
        "invalid_credentials" => "Неверный email или пароль.",
        "missing_fields" => "Заполните обязательные поля.",
        "invalid_email" => "Некорректный email.",
        "invalid_year" => "Год должен быть числом от 1900 до текущего.",
        "invalid_count" => "Показатели должны быть неотрицательными целыми числами.",
        "invalid_date" => "Дата должна быть в формате ГГГГ-ММ-ДД.",
        "invalid_role" => "Неизвестная роль.",
        "duplicate_email" => "Пользователь с таким email уже существует.",
        "missing_password" => "Введите пароль.",
        "hash_failed" => "Не удалось обработать пароль, попробуйте ещё раз.",
        "lecturer_not_found" => "Преподаватель не найден.",
        "unknown_lecturer" => "Указан несуществующий преподаватель.",
        "publication_not_found" => "Публикация не найдена.",
        "user_not_found" => "Пользователь не найден.",
        "feedback_not_found" => "Сообщение не найдено.",
        "news_not_found" => "Новость не найдена.",
        "faq_not_found" => "Вопрос не найден.",
        "self_action" => "Нельзя заблокировать или удалить собственную учётную запись.",
        "not_linked" => "Учётная запись не связана с карточкой преподавателя.",
        _ => "Произошла ошибка. Подробности в журнале сервера.",
    }
}

/// Builds the flash banner for known status or error codes.
pub fn compose_flash_message(status: Option<&str>, error: Option<&str>) -> String {
    if let Some(status) = status {
        let message = status_message(status);
        if !message.is_empty() {
            return format!(r#"<div class="flash success">{message}</div>"#);
        }
    }

    if let Some(error) = error {
        let message = error_message(error);
        return format!(r#"<div class="flash error">{message}</div>"#);
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_status_renders_success_banner() {
        let html = compose_flash_message(Some("approved"), None);
        assert!(html.contains("flash success"));
        assert!(html.contains("одобрена"));
    }

    #[test]
    fn unknown_error_falls_back_to_generic_text() {
        let html = compose_flash_message(None, Some("boom"));
        assert!(html.contains("flash error"));
        assert!(html.contains("журнале"));
    }

    #[test]
    fn unknown_status_without_error_is_empty() {
        assert!(compose_flash_message(Some("nope"), None).is_empty());
    }
}
