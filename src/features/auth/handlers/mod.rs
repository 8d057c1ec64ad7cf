pub mod auth_handler;

pub use auth_handler::{
    confirm_email, index, login, login_page, logout, register, register_page, set_username,
    set_username_page, verify_email,
};
