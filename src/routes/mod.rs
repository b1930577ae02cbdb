mod auth;
mod health_check;
mod password_reset;
mod sessions;

pub use auth::{get_current_player, login, logout, refresh, register};
pub use health_check::health_check;
pub use password_reset::{confirm_reset, request_reset, verify_reset};
pub use sessions::{list_sessions, revoke_all_sessions, revoke_session};
