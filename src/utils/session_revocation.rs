use std::time::Duration;

use moka::future::Cache;

/// Session ids (`jti`) logged out before their token expired.
/// Entries only need to outlive the token itself.
#[derive(Clone)]
pub struct RevokedSessions {
    cache: Cache<String, ()>,
}

impl RevokedSessions {
    pub fn new(session_ttl_secs: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(session_ttl_secs))
                .build(),
        }
    }

    pub async fn revoke(&self, jti: &str) {
        self.cache.insert(jti.to_string(), ()).await;
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.cache.get(jti).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_ids_are_remembered() {
        let revoked = RevokedSessions::new(60);
        assert!(!revoked.is_revoked("a").await);
        revoked.revoke("a").await;
        revoked.revoke("a").await;
        assert!(revoked.is_revoked("a").await);
        assert!(!revoked.is_revoked("b").await);
    }
}
