pub mod admin;
pub mod auth;
pub mod content;
pub mod dashboard;
pub mod feedback;
pub mod flash;
pub mod lecturers;
pub mod publications;
pub mod reports;
pub mod responses;
pub mod review;
pub mod router;
pub mod state;
pub mod submissions;
pub mod templates;

pub use auth::{AuthUser, SESSION_COOKIE};
pub use state::AppState;
pub use templates::{escape_html, render_footer, render_login_page};
