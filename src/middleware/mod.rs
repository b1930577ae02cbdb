/// Request middleware
///
/// The auth gateway resolves bearer tokens into an authentication context.

mod auth_gateway;

pub use auth_gateway::AuthContext;
