/// Authentication module
///
/// Token issuance/verification, password hashing, the session store backing
/// refresh tokens, and the password-reset ledger.

mod claims;
mod jwt;
mod password;
mod reset;
mod session;

pub use claims::{Claims, TokenType};
pub use jwt::{issue_access_token, issue_refresh_token, issue_reset_token, verify_token};
pub use password::{hash_password, verify_password};
pub use reset::{consume_reset_token, request_password_reset, verify_reset_token};
pub use session::{
    create_session, delete_all_sessions, delete_session, delete_session_by_hash,
    find_session_by_hash, hash_token, list_active_sessions, rotate_session, ClientInfo, Session,
};
