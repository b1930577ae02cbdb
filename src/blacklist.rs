/// Access-Token Revocation List
///
/// Access tokens are stateless and normally self-validating; this list is
/// the only way to kill one before its natural expiry (logout). Entries are
/// written with a TTL equal to the token's remaining lifetime, so the list
/// never holds more than the not-yet-expired tokens ever revoked.
///
/// Backed by a shared key-value store with SET-with-expiry semantics. The
/// handle is built once at startup and passed explicitly to every component
/// that needs it.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::auth::hash_token;
use crate::configuration::RedisSettings;
use crate::error::AppError;

#[derive(Clone)]
pub struct TokenBlacklist {
    conn: ConnectionManager,
}

impl TokenBlacklist {
    /// Connect to the revocation cache
    ///
    /// # Errors
    /// Returns a cache error if the store is unreachable
    pub async fn connect(config: &RedisSettings) -> Result<Self, AppError> {
        tracing::info!("Connecting to revocation cache");

        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!("Revocation cache connected");
        Ok(Self { conn })
    }

    /// Key entries by the token's hash so raw credentials never land in the store
    fn key(token: &str) -> String {
        format!("blacklist:{}", hash_token(token))
    }

    /// Record an access token so it is rejected for the rest of its lifetime
    ///
    /// A token at or past its natural expiry needs no entry; the call is a
    /// no-op then.
    ///
    /// # Errors
    /// Returns a cache error if the store is unreachable
    pub async fn blacklist(
        &self,
        token: &str,
        remaining_ttl_seconds: i64,
    ) -> Result<(), AppError> {
        if remaining_ttl_seconds <= 0 {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(token), "1", remaining_ttl_seconds as u64)
            .await?;

        tracing::info!(ttl = remaining_ttl_seconds, "Access token blacklisted");
        Ok(())
    }

    /// Check whether an access token has been revoked
    ///
    /// # Errors
    /// Returns a cache error if the store is unreachable; connectivity
    /// problems are never silently treated as "not revoked"
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let entry: Option<String> = conn.get(Self::key(token)).await?;
        Ok(entry.is_some())
    }
}
