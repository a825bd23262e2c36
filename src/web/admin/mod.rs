mod content;
mod feedback;
mod log;
mod users;

pub use content::{create_faq, create_news, delete_faq, delete_news, faq_page, news_page};
pub use feedback::{delete_feedback, feedback_page};
pub use log::audit_log;
pub use users::{
    block_user, create_user, delete_user, edit_user_page, reset_password, update_user, users_page,
};
