use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::{review::ReviewStatus, roles::Capability};

use super::auth::AuthUser;

const BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 1.25rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-bar h1 { margin: 0; font-size: 1.35rem; }
        nav { display: flex; flex-wrap: wrap; gap: 0.5rem; margin-top: 0.85rem; }
        nav a { color: #1d4ed8; text-decoration: none; font-weight: 600; background: #e0f2fe; padding: 0.4rem 0.85rem; border-radius: 999px; border: 1px solid #bfdbfe; }
        nav a:hover { background: #bfdbfe; }
        nav a.admin { color: #0f172a; background: #fee2e2; border-color: #fecaca; }
        .user-box { display: flex; gap: 0.75rem; align-items: center; color: #475569; }
        .user-box form { margin: 0; }
        main { padding: 2rem 1.5rem; max-width: 1080px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2.5rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); margin-bottom: 1.5rem; }
        .panel h2 { margin-top: 0; }
        label { display: block; margin: 0.75rem 0 0.35rem; font-weight: 600; }
        input, select, textarea { width: 100%; padding: 0.6rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; font: inherit; }
        input[type="checkbox"] { width: auto; margin-right: 0.5rem; }
        .checkbox-list label { font-weight: 400; display: flex; align-items: center; }
        button { margin-top: 1rem; padding: 0.6rem 1.1rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; }
        button:hover { background: #1d4ed8; }
        button.danger { background: #dc2626; }
        button.danger:hover { background: #b91c1c; }
        button.link { background: none; color: #1d4ed8; padding: 0; margin: 0; }
        table { width: 100%; border-collapse: collapse; margin-top: 1rem; background: #ffffff; border: 1px solid #e2e8f0; }
        th, td { padding: 0.6rem 0.8rem; border-bottom: 1px solid #e2e8f0; text-align: left; vertical-align: top; }
        th { background: #f1f5f9; font-weight: 600; }
        .inline-form { display: inline; }
        .inline-form button { margin-top: 0; }
        .actions { display: flex; gap: 0.5rem; flex-wrap: wrap; align-items: center; }
        .flash { padding: 0.85rem 1rem; border-radius: 10px; margin-bottom: 1.25rem; }
        .flash.success { background: #dcfce7; color: #166534; }
        .flash.error { background: #fee2e2; color: #b91c1c; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .status-tag { display: inline-block; padding: 0.2rem 0.65rem; border-radius: 999px; font-size: 0.85rem; font-weight: 600; white-space: nowrap; }
        .status-tag.new { background: #fef3c7; color: #92400e; }
        .status-tag.revision_required { background: #e0f2fe; color: #1d4ed8; }
        .status-tag.approved { background: #dcfce7; color: #166534; }
        .status-tag.rejected { background: #fee2e2; color: #b91c1c; }
        .review-card { border: 1px solid #e2e8f0; border-radius: 12px; padding: 1rem 1.25rem; margin-bottom: 1rem; background: #ffffff; }
        .review-card h3 { margin: 0 0 0.5rem; font-size: 1.05rem; }
        .review-forms { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 1rem; }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 1rem; }
        .stat { background: #f1f5f9; border-radius: 12px; padding: 1rem; }
        .stat strong { display: block; font-size: 1.6rem; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
            th, td { padding: 0.45rem; }
        }
"#;

pub struct PageLayout<'a> {
    pub title: &'a str,
    pub user: Option<&'a AuthUser>,
    pub flash_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
}

impl<'a> PageLayout<'a> {
    pub fn new(title: &'a str, user: Option<&'a AuthUser>, body_html: impl Into<Cow<'a, str>>) -> Self {
        Self {
            title,
            user,
            flash_html: Cow::Borrowed(""),
            body_html: body_html.into(),
        }
    }

    pub fn with_flash(mut self, flash_html: impl Into<Cow<'a, str>>) -> Self {
        self.flash_html = flash_html.into();
        self
    }
}

/// Navigation entries and the capability each one needs. `None` is public.
const NAV_LINKS: &[(&str, &str, Option<Capability>)] = &[
    ("/dashboard", "Главная", Some(Capability::ViewDashboard)),
    ("/lecturers", "Преподаватели", None),
    ("/publications", "Публикации", None),
    ("/reports", "Отчёты", None),
    ("/news", "Новости", None),
    ("/faq", "FAQ", None),
    ("/feedback", "Обратная связь", None),
    ("/my/publications", "Мои публикации", Some(Capability::SubmitPublications)),
    ("/review", "Проверка", Some(Capability::ReviewPublications)),
];

const ADMIN_LINKS: &[(&str, &str, Capability)] = &[
    ("/admin/users", "Пользователи", Capability::ManageUsers),
    ("/admin/feedback", "Сообщения", Capability::ModerateFeedback),
    ("/admin/news", "Управление новостями", Capability::ManageContent),
    ("/admin/faq", "Управление FAQ", Capability::ManageContent),
    ("/admin/log", "Журнал", Capability::ViewAuditLog),
];

fn render_nav(user: Option<&AuthUser>) -> String {
    let allowed = |capability: Option<Capability>| match capability {
        None => true,
        Some(capability) => user.is_some_and(|user| user.can(capability)),
    };

    let mut nav = String::from("<nav>");
    for (href, label, capability) in NAV_LINKS {
        if allowed(*capability) {
            nav.push_str(&format!(r#"<a href="{href}">{label}</a>"#));
        }
    }
    for (href, label, capability) in ADMIN_LINKS {
        if allowed(Some(*capability)) {
            nav.push_str(&format!(r#"<a class="admin" href="{href}">{label}</a>"#));
        }
    }
    nav.push_str("</nav>");
    nav
}

fn render_user_box(user: Option<&AuthUser>) -> String {
    match user {
        Some(user) => format!(
            r#"<div class="user-box"><span>{fio} · {role}</span><form method="post" action="/logout"><button type="submit" class="link">Выйти</button></form></div>"#,
            fio = escape_html(&user.fio),
            role = user.role.label_ru(),
        ),
        None => r#"<div class="user-box"><a href="/login">Войти</a></div>"#.to_string(),
    }
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        title,
        user,
        flash_html,
        body_html,
    } = layout;

    let nav = render_nav(user);
    let user_box = render_user_box(user);
    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>{title} · Научные показатели</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{title}</h1>
            {user_box}
        </div>
        {nav}
    </header>
    <main>
        {flash_html}
{body_html}
        {footer}
    </main>
</body>
</html>"#,
        title = escape_html(title),
        styles = BASE_STYLES,
    )
}

/// Standalone page for 404 and 500 responses.
pub fn render_message_page(title: &str, message: &str) -> String {
    let body = format!(
        r#"<section class="panel"><p class="note">{message}</p><p><a href="/">На главную</a></p></section>"#,
        message = escape_html(message),
    );
    render_page(PageLayout::new(title, None, body))
}

pub fn render_login_page(flash_html: &str) -> String {
    let footer = render_footer();
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>Вход · Научные показатели</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; }}
        main {{ width: 100%; max-width: 440px; }}
        .panel {{ background: #ffffff; padding: 2.25rem 2rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); border: 1px solid #e2e8f0; }}
        h1 {{ margin: 0 0 1rem; font-size: 1.6rem; text-align: center; }}
        p.description {{ margin: 0 0 1.5rem; color: #475569; text-align: center; font-size: 0.95rem; }}
        label {{ display: block; margin-top: 1.1rem; font-weight: 600; }}
        input {{ width: 100%; padding: 0.8rem; margin-top: 0.5rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; font-size: 1rem; box-sizing: border-box; }}
        button {{ margin-top: 1.75rem; width: 100%; padding: 0.9rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }}
        button:hover {{ background: #1d4ed8; }}
        .flash {{ padding: 0.75rem 1rem; border-radius: 10px; margin-bottom: 1rem; }}
        .flash.success {{ background: #dcfce7; color: #166534; }}
        .flash.error {{ background: #fee2e2; color: #b91c1c; }}
        .public-link {{ display: block; margin-top: 1.25rem; text-align: center; color: #1d4ed8; }}
        .app-footer {{ margin-top: 2rem; text-align: center; font-size: 0.85rem; color: #64748b; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Научные показатели</h1>
            <p class="description">Войдите с учётной записью, выданной администратором.</p>
            {flash_html}
            <form method="post" action="/login">
                <label for="email">Email</label>
                <input id="email" type="email" name="email" required>
                <label for="password">Пароль</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">Войти</button>
            </form>
            <a class="public-link" href="/lecturers">Открытые страницы портала</a>
        </section>
        {footer}
    </main>
</body>
</html>"#,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© 2024-{current_year} Научный отдел университета</footer>"#
    )
}

pub fn status_badge(status: ReviewStatus) -> String {
    format!(
        r#"<span class="status-tag {class}">{label}</span>"#,
        class = status.as_str(),
        label = status.label_ru(),
    )
}

/// Renders an optional external link, or a dash when empty.
pub fn render_link(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return "—".to_string();
    }
    let escaped = escape_html(url);
    format!(r#"<a href="{escaped}" target="_blank" rel="noopener">ссылка</a>"#)
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: 1,
            fio: "Иванов <b>".to_string(),
            email: "ivanov@university.ru".to_string(),
            role,
            lecturer_id: None,
        }
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn navigation_follows_capabilities() {
        let staff = user(Role::Staff);
        let nav = render_nav(Some(&staff));
        assert!(nav.contains("/review"));
        assert!(!nav.contains("/admin/users"));
        assert!(!nav.contains("/my/publications"));

        let admin = user(Role::Admin);
        let nav = render_nav(Some(&admin));
        assert!(nav.contains("/admin/users"));
        assert!(!nav.contains("/review"));

        let anonymous = render_nav(None);
        assert!(anonymous.contains("/lecturers"));
        assert!(!anonymous.contains("/dashboard"));
    }

    #[test]
    fn page_escapes_user_name() {
        let admin = user(Role::Admin);
        let html = render_page(PageLayout::new("Главная", Some(&admin), "<p>body</p>"));
        assert!(html.contains("Иванов &lt;b&gt;"));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn empty_link_renders_dash() {
        assert_eq!(render_link("  "), "—");
        assert!(render_link("https://doi.org/x").contains("href=\"https://doi.org/x\""));
    }
}
