//! TTL cache in front of the credential store.
//!
//! # Responsibilities
//! - Serve repeated lookups for the same username without store round-trips
//! - Re-fetch entries whose TTL has elapsed
//!
//! # Design Decisions
//! - Raw records are cached; permission expiry and precedence are applied
//!   by the authenticator on every request
//! - Negative results are cached too, so unknown callers cannot hammer
//!   the store
//! - A TTL of zero disables caching entirely

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::auth::store::{AuthStoreError, CredentialStore};
use crate::model::{PermissionRecord, UserRecord};

#[derive(Clone)]
struct CacheEntry {
    user: Option<UserRecord>,
    permission: Option<PermissionRecord>,
    fetched_at: Instant,
}

/// Read-mostly cache over usernames. Cache fills go through dashmap's
/// shard locks; concurrent fills for the same name are last-writer-wins.
pub struct CredentialCache {
    store: Arc<dyn CredentialStore>,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration) -> CredentialCache {
        CredentialCache {
            store,
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Both records for a username, from cache when fresh.
    pub async fn lookup(
        &self,
        username: &str,
    ) -> Result<(Option<UserRecord>, Option<PermissionRecord>), AuthStoreError> {
        if !self.ttl.is_zero() {
            if let Some(entry) = self.entries.get(username) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok((entry.user.clone(), entry.permission.clone()));
                }
            }
        }

        let permission = self.store.find_permission(username).await?;
        let user = self.store.find_user(username).await?;

        if !self.ttl.is_zero() {
            self.entries.insert(
                username.to_string(),
                CacheEntry {
                    user: user.clone(),
                    permission: permission.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok((user, permission))
    }

    /// Drop a cached entry, forcing the next lookup through the store.
    pub fn invalidate(&self, username: &str) {
        self.entries.remove(username);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use std::collections::HashSet;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            username: name.into(),
            password_hash: "x".into(),
            categories: HashSet::new(),
            ops: HashSet::new(),
            indices: vec![],
        }
    }

    #[tokio::test]
    async fn test_cache_serves_and_invalidates() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert_user(user("alice"));

        let cache = CredentialCache::new(store.clone(), Duration::from_secs(60));
        let (found, _) = cache.lookup("alice").await.unwrap();
        assert!(found.is_some());

        // Store mutation is invisible until invalidation.
        store.insert_user(UserRecord {
            password_hash: "changed".into(),
            ..user("alice")
        });
        let (cached, _) = cache.lookup("alice").await.unwrap();
        assert_eq!(cached.unwrap().password_hash, "x");

        cache.invalidate("alice");
        let (fresh, _) = cache.lookup("alice").await.unwrap();
        assert_eq!(fresh.unwrap().password_hash, "changed");
    }

    #[tokio::test]
    async fn test_negative_results_cached() {
        let store = Arc::new(MemoryCredentialStore::new());
        let cache = CredentialCache::new(store, Duration::from_secs(60));
        let (u, p) = cache.lookup("ghost").await.unwrap();
        assert!(u.is_none() && p.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert_user(user("bob"));
        let cache = CredentialCache::new(store, Duration::ZERO);
        cache.lookup("bob").await.unwrap();
        assert!(cache.is_empty());
    }
}
