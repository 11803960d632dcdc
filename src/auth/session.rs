use std::time::Duration;

use moka::future::Cache;

/// Tokens invalidated by logout, keyed by `jti`. Entries expire together with
/// the token they revoke, so the cache never outgrows the live session set.
#[derive(Clone)]
pub struct SessionRegistry {
    revoked: Cache<String, ()>,
}

impl SessionRegistry {
    pub fn new(token_ttl_secs: usize) -> Self {
        Self {
            revoked: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(token_ttl_secs as u64))
                .build(),
        }
    }

    pub async fn revoke(&self, jti: &str) {
        self.revoked.insert(jti.to_string(), ()).await;
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn revoked_tokens_are_remembered() {
        let sessions = SessionRegistry::new(60);
        assert!(!sessions.is_revoked("abc"));

        sessions.revoke("abc").await;
        assert!(sessions.is_revoked("abc"));
        assert!(!sessions.is_revoked("def"));
    }
}
