//! Bounded TTL cache for provider responses.

use aegis_core::models::{GeoPoint, Route};
use dashmap::DashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Maximum cached-route age before an entry is treated as a miss.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
/// Size bound enforced on insert.
pub const DEFAULT_MAX_SIZE: usize = 500;

/// Time source for TTL checks, injectable so expiry is deterministic under
/// test.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cache key for a waypoint sequence: the profile plus each point rounded
/// to five decimals (~1.1 m), so nearby repeat queries collide on purpose.
pub fn signature(profile: &str, waypoints: &[GeoPoint]) -> String {
    let mut key = String::with_capacity(profile.len() + waypoints.len() * 24);
    key.push_str(profile);
    for point in waypoints {
        let _ = write!(key, "|{:.5},{:.5}", point.lat, point.lon);
    }
    key
}

struct CachedRoute {
    route: Route,
    inserted_at: Instant,
    seq: u64,
}

/// Memo of provider responses keyed by (profile, waypoint signature).
///
/// A `get` hits only while the entry's age is under the TTL. When an insert
/// pushes the map over its size bound, TTL-expired entries are purged first
/// and the remainder is evicted in pure insertion order (FIFO, not access
/// order): reuse here comes from identical repeated queries, so recency
/// carries no signal.
///
/// Reads go straight to the `DashMap`; the insert+evict sequence is
/// serialized so the size invariant holds under concurrent hazard passes.
pub struct RouteCache {
    entries: DashMap<String, CachedRoute>,
    write_lock: Mutex<()>,
    next_seq: AtomicU64,
    ttl: Duration,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_SIZE)
    }
}

impl RouteCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self::with_clock(ttl, max_size, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
            next_seq: AtomicU64::new(0),
            ttl,
            max_size,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch a cached route. Expired entries are never returned; they are
    /// removed lazily by the eviction sweep on a later insert.
    pub fn get(&self, key: &str) -> Option<Route> {
        let entry = self.entries.get(key)?;
        if self.clock.now().duration_since(entry.inserted_at) >= self.ttl {
            return None;
        }
        Some(entry.route.clone())
    }

    /// Insert or overwrite an entry, then enforce the size bound.
    pub fn put(&self, key: &str, route: Route) {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            key.to_string(),
            CachedRoute {
                route,
                inserted_at: self.clock.now(),
                seq,
            },
        );
        self.evict_over_capacity();
    }

    fn evict_over_capacity(&self) {
        if self.entries.len() <= self.max_size {
            return;
        }

        let now = self.clock.now();
        let mut expired: Vec<String> = Vec::new();
        let mut remaining: Vec<(String, u64)> = Vec::new();
        for entry in self.entries.iter() {
            if now.duration_since(entry.value().inserted_at) >= self.ttl {
                expired.push(entry.key().clone());
            } else {
                remaining.push((entry.key().clone(), entry.value().seq));
            }
        }

        for key in expired {
            self.entries.remove(&key);
        }
        if self.entries.len() <= self.max_size {
            return;
        }

        remaining.sort_by_key(|(_, seq)| *seq);
        for (key, _) in remaining {
            if self.entries.len() <= self.max_size {
                break;
            }
            self.entries.remove(&key);
        }
    }
}
