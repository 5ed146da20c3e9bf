//! Access evaluator
//!
//! Role-to-permission resolution with tenant-scope enforcement. Permission
//! sets are flat lists of lowercase strings stored per role in the
//! `role_permissions` collection; `*` grants everything and a `.self`
//! suffix restricts a permission to resources the caller owns.
//!
//! Resolution is fail-closed: a missing role document or a store failure
//! yields an empty permission set, never an open gate. Sets are cached in
//! memory for a fixed TTL; there is no invalidation hook, so permission
//! edits take effect only once the TTL lapses.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{error, warn};

use aviso_store::DocumentStore;

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::identity::Identity;

const ROLE_PERMISSIONS: &str = "role_permissions";

/// Grants every permission
pub const WILDCARD: &str = "*";

/// Suffix marking an owner-scoped permission variant
pub const SELF_SUFFIX: &str = ".self";

/// Stored shape of a role's permission document
#[derive(Debug, Deserialize)]
struct RolePermissionsRecord {
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Clone)]
struct CachedPermissions {
    permissions: Arc<HashSet<String>>,
    expires_at: DateTime<Utc>,
}

/// Permission gate consulted by every resource endpoint
pub struct AccessEvaluator {
    store: Arc<dyn DocumentStore>,
    clock: SharedClock,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedPermissions>>,
}

impl AccessEvaluator {
    /// Create an evaluator from configuration
    pub fn new(store: Arc<dyn DocumentStore>, clock: SharedClock, config: &AuthConfig) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::from_std(config.permission_cache_ttl)
                .unwrap_or_else(|_| Duration::seconds(300)),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Gate an operation: succeed silently or fail with the denial
    ///
    /// Order matters and is part of the contract:
    /// 1. no identity is unauthenticated, not forbidden;
    /// 2. the global super-tenant bypasses everything;
    /// 3. a wildcard permission set bypasses everything else;
    /// 4. the tenant boundary is enforced *before* the named permission is
    ///    even looked at, so holding a permission never allows cross-tenant
    ///    use of it;
    /// 5. direct match, then the `.self` variant against `owner`.
    pub async fn check(
        &self,
        identity: Option<&Identity>,
        permission: &str,
        target_tenant: Option<&str>,
        owner: Option<&str>,
    ) -> Result<()> {
        let Some(identity) = identity else {
            return Err(AuthError::Unauthenticated);
        };
        if identity.is_global() {
            return Ok(());
        }

        let permissions = self.permissions(&identity.role).await;
        if permissions.contains(WILDCARD) {
            return Ok(());
        }

        if let Some(target) = target_tenant.map(str::trim).filter(|t| !t.is_empty()) {
            if !target.eq_ignore_ascii_case(&identity.tenant_id) {
                return Err(AuthError::forbidden("cannot operate on another school"));
            }
        }

        let wanted = permission.to_lowercase();
        if permissions.contains(&wanted) {
            return Ok(());
        }

        let self_variant = format!("{}{}", wanted, SELF_SUFFIX);
        if permissions.contains(&self_variant) {
            let owns = owner.is_some_and(|o| o.eq_ignore_ascii_case(&identity.email));
            return if owns {
                Ok(())
            } else {
                Err(AuthError::forbidden("access limited to own resources"))
            };
        }

        Err(AuthError::forbidden(format!(
            "missing required permission: {}",
            permission
        )))
    }

    /// Resolve a role's permission set, cache-aside with TTL
    ///
    /// Infallible by design: unknown roles and store failures both come
    /// back as the empty set. Concurrent misses may refetch in parallel;
    /// the refetch is idempotent, so the race is harmless.
    pub async fn permissions(&self, role: &str) -> Arc<HashSet<String>> {
        if role.trim().is_empty() {
            return Arc::new(HashSet::new());
        }
        let key = role.to_uppercase();
        let now = self.clock.now();

        if let Some(cached) = self.cache.read().get(&key) {
            if cached.expires_at > now {
                return cached.permissions.clone();
            }
        }

        let permissions = match self.store.get(ROLE_PERMISSIONS, &key).await {
            Ok(Some(doc)) => match serde_json::from_value::<RolePermissionsRecord>(doc) {
                Ok(record) => Arc::new(
                    record
                        .permissions
                        .into_iter()
                        .map(|p| p.to_lowercase())
                        .collect::<HashSet<_>>(),
                ),
                Err(e) => {
                    error!(role = %key, "malformed permission document: {}", e);
                    Arc::new(HashSet::new())
                }
            },
            Ok(None) => {
                warn!(role = %key, "no permissions defined for role");
                Arc::new(HashSet::new())
            }
            Err(e) => {
                // Fail closed, and do not cache: the next request retries.
                error!(role = %key, "permission lookup failed: {}", e);
                return Arc::new(HashSet::new());
            }
        };

        self.cache.write().insert(
            key,
            CachedPermissions {
                permissions: permissions.clone(),
                expires_at: now + self.ttl,
            },
        );
        permissions
    }
}
