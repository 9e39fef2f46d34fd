//! Caller credentials and their policy triple.
//!
//! # Responsibilities
//! - Represent the two credential kinds: root users and scoped permissions
//! - Answer policy questions (category / operation / index access)
//! - Verify presented secrets without leaking timing
//!
//! # Design Decisions
//! - A permission with `ttl_secs > 0` expires; ttl 0 never expires
//! - User secrets are stored as bcrypt hashes; permission secrets are
//!   generated tokens compared byte-for-byte in constant time

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::index::pattern_matches;
use crate::model::{Category, IndexSet, Operation};

/// A root user. Carries a bcrypt password hash and the policy triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub categories: HashSet<Category>,
    #[serde(default)]
    pub ops: HashSet<Operation>,
    #[serde(default)]
    pub indices: Vec<String>,
}

/// A scoped, time-bounded credential minted for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub categories: HashSet<Category>,
    #[serde(default)]
    pub ops: HashSet<Operation>,
    #[serde(default)]
    pub indices: Vec<String>,
    /// Lifetime in seconds; 0 means the permission never expires.
    #[serde(default)]
    pub ttl_secs: u64,
    /// Creation time as seconds since the epoch.
    #[serde(default)]
    pub created_at: u64,
}

impl PermissionRecord {
    /// An expired permission is treated as absent by the authenticator.
    pub fn is_expired(&self, now_epoch_secs: u64) -> bool {
        self.ttl_secs > 0 && self.created_at + self.ttl_secs < now_epoch_secs
    }
}

/// The credential resolved for a request: exactly one of these is written
/// into the request context by the authenticator.
#[derive(Debug, Clone)]
pub enum Credential {
    User(UserRecord),
    Permission(PermissionRecord),
}

impl Credential {
    pub fn username(&self) -> &str {
        match self {
            Credential::User(u) => &u.username,
            Credential::Permission(p) => &p.username,
        }
    }

    pub fn categories(&self) -> &HashSet<Category> {
        match self {
            Credential::User(u) => &u.categories,
            Credential::Permission(p) => &p.categories,
        }
    }

    pub fn ops(&self) -> &HashSet<Operation> {
        match self {
            Credential::User(u) => &u.ops,
            Credential::Permission(p) => &p.ops,
        }
    }

    pub fn index_patterns(&self) -> &[String] {
        match self {
            Credential::User(u) => &u.indices,
            Credential::Permission(p) => &p.indices,
        }
    }

    pub fn allows_category(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    pub fn allows_operation(&self, op: Operation) -> bool {
        self.ops().contains(&op)
    }

    /// Every concrete index in the request set must match one of the
    /// credential's patterns. A cluster-wide (empty) request set requires
    /// the unrestricted `"*"` grant.
    pub fn allows_indices(&self, indices: &IndexSet) -> bool {
        let patterns = self.index_patterns();
        if indices.is_all() {
            return patterns.iter().any(|p| p == "*");
        }
        indices
            .iter()
            .all(|index| patterns.iter().any(|p| pattern_matches(p, index)))
    }

    /// First index in the request set not covered by the credential, for
    /// error reporting.
    pub fn first_denied_index(&self, indices: &IndexSet) -> Option<String> {
        let patterns = self.index_patterns();
        indices
            .iter()
            .find(|index| !patterns.iter().any(|p| pattern_matches(p, index)))
            .map(str::to_string)
    }

    /// Verify the secret presented in the Basic auth header. Users verify
    /// through bcrypt; permission tokens compare in constant time.
    pub fn verify_secret(&self, secret: &str) -> bool {
        match self {
            Credential::User(u) => bcrypt::verify(secret, &u.password_hash).unwrap_or(false),
            Credential::Permission(p) => {
                constant_time_eq(p.password.as_bytes(), secret.as_bytes())
            }
        }
    }
}

pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(indices: &[&str]) -> Credential {
        Credential::Permission(PermissionRecord {
            username: "p".into(),
            password: "tok".into(),
            categories: [Category::Search].into_iter().collect(),
            ops: [Operation::Read].into_iter().collect(),
            indices: indices.iter().map(|s| s.to_string()).collect(),
            ttl_secs: 0,
            created_at: 0,
        })
    }

    #[test]
    fn test_permission_expiry() {
        let mut p = PermissionRecord {
            username: "p".into(),
            password: "tok".into(),
            categories: HashSet::new(),
            ops: HashSet::new(),
            indices: vec![],
            ttl_secs: 60,
            created_at: 1_000,
        };
        assert!(!p.is_expired(1_030));
        assert!(p.is_expired(1_061));
        p.ttl_secs = 0;
        assert!(!p.is_expired(u64::MAX));
    }

    #[test]
    fn test_index_policy() {
        let cred = permission(&["logs-*", "twitter"]);
        let mut request = IndexSet::new();
        request.insert("logs-2024");
        request.insert("twitter");
        assert!(cred.allows_indices(&request));

        let mut denied = IndexSet::new();
        denied.insert("logslive");
        assert!(!cred.allows_indices(&denied));
        assert_eq!(cred.first_denied_index(&denied).as_deref(), Some("logslive"));

        // Cluster-wide requests need the unrestricted grant.
        assert!(!cred.allows_indices(&IndexSet::new()));
        assert!(permission(&["*"]).allows_indices(&IndexSet::new()));
    }

    #[test]
    fn test_permission_secret_compare() {
        let cred = permission(&["*"]);
        assert!(cred.verify_secret("tok"));
        assert!(!cred.verify_secret("tok2"));
        assert!(!cred.verify_secret(""));
    }

    #[test]
    fn test_user_secret_bcrypt() {
        let hash = bcrypt::hash("pass", 4).unwrap();
        let cred = Credential::User(UserRecord {
            username: "user".into(),
            password_hash: hash,
            categories: HashSet::new(),
            ops: HashSet::new(),
            indices: vec![],
        });
        assert!(cred.verify_secret("pass"));
        assert!(!cred.verify_secret("nope"));
    }
}
