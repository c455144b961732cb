//! TTL-bounded cache of sessions keyed by region.

use super::Session;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Lifetime of a cached session. Short enough to pick up rotated
/// credentials from assumed roles.
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache key for a region's session. The empty region is a valid key.
pub fn session_cache_key(region: &str) -> String {
    format!("session-{}", region)
}

struct CacheEntry {
    session: Arc<Session>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Concurrent per-connection session cache.
///
/// Lookups after an entry's TTL are misses. Concurrent misses may each
/// build a session; the last `set` wins.
pub struct SessionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl SessionCache {
    /// Cache with the standard [`SESSION_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Cache with a custom default TTL.
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Default TTL applied by [`SessionCache::set`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Live session for `region`, if any.
    pub fn get(&self, region: &str) -> Option<Arc<Session>> {
        let key = session_cache_key(region);
        let entries = self.entries.read();
        match entries.get(&key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                trace!(key = %key, "Session cache hit");
                Some(entry.session.clone())
            }
            Some(_) => {
                trace!(key = %key, "Session cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store a session with the default TTL.
    pub fn set(&self, region: &str, session: Arc<Session>) {
        self.set_with_ttl(region, session, self.default_ttl);
    }

    /// Store a session with an explicit TTL.
    pub fn set_with_ttl(&self, region: &str, session: Arc<Session>, ttl: Duration) {
        let key = session_cache_key(region);
        trace!(key = %key, ttl_secs = ttl.as_secs(), "Caching session");
        self.entries.write().insert(
            key,
            CacheEntry {
                session,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop the session for `region`. Returns whether one was present.
    pub fn invalidate(&self, region: &str) -> bool {
        self.entries.write().remove(&session_cache_key(region)).is_some()
    }

    /// Drop every session.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Remove expired entries and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("entries", &self.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
