use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Identifies a cached query: path segments plus query-string params.
/// Segments join into the request path, e.g. `["/api/posts", id]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    segments: Vec<String>,
    params: Vec<(String, String)>,
}

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Prefix match on segments; params never take part.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.segments.len()
            && self.segments.iter().zip(prefix).all(|(s, p)| s == p)
    }
}

struct Entry {
    value: Value,
    fetched_at: Instant,
}

/// Query results by key. Entries past `stale_time` are refetched.
pub struct QueryCache {
    entries: HashMap<QueryKey, Entry>,
    stale_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stale_time,
        }
    }

    pub fn get_fresh(&self, key: &QueryKey) -> Option<&Value> {
        self.get_fresh_at(key, Instant::now())
    }

    fn get_fresh_at(&self, key: &QueryKey, now: Instant) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.stale_time)
            .map(|entry| &entry.value)
    }

    pub fn insert(&mut self, key: QueryKey, value: Value) {
        self.entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many went.
    pub fn invalidate(&mut self, prefix: &[&str]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
