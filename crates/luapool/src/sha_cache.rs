use dashmap::DashMap;

/// This component's belief about whether a script is present in an
/// endpoint's server-side script cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never attempted against this endpoint.
    Unknown,
    /// A load succeeded and no eviction signal has been observed since.
    Loaded,
    /// The server reported the script unknown; the next evaluation must
    /// reload before executing.
    Stale,
}

/// Per (address, script name) record of [`LoadState`].
///
/// Read and written by concurrent evaluator calls targeting the same
/// endpoint. Every transition is a single map operation, so a `mark_stale`
/// can never be lost to a racing read-modify-write (a lost stale mark
/// would pin a permanent NOSCRIPT loop; a lost `mark_loaded` only costs
/// one redundant load).
#[derive(Debug, Default)]
pub struct ShaCache {
    states: DashMap<(String, String), LoadState>,
}

impl ShaCache {
    /// Create a new, empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current load state for the pair; `Unknown` if never recorded.
    #[must_use]
    pub fn get(&self, address: &str, name: &str) -> LoadState {
        self.states
            .get(&(address.to_owned(), name.to_owned()))
            .map_or(LoadState::Unknown, |entry| *entry.value())
    }

    /// Record a successful load on this endpoint.
    pub fn mark_loaded(&self, address: &str, name: &str) {
        self.states
            .insert((address.to_owned(), name.to_owned()), LoadState::Loaded);
    }

    /// Record an eviction signal; forces a reload on the next evaluation.
    pub fn mark_stale(&self, address: &str, name: &str) {
        self.states
            .insert((address.to_owned(), name.to_owned()), LoadState::Stale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecorded_pair_is_unknown() {
        let cache = ShaCache::new();
        assert_eq!(cache.get("localhost:6379", "Test"), LoadState::Unknown);
    }

    #[test]
    fn transitions() {
        let cache = ShaCache::new();
        cache.mark_loaded("localhost:6379", "Test");
        assert_eq!(cache.get("localhost:6379", "Test"), LoadState::Loaded);

        cache.mark_stale("localhost:6379", "Test");
        assert_eq!(cache.get("localhost:6379", "Test"), LoadState::Stale);

        cache.mark_loaded("localhost:6379", "Test");
        assert_eq!(cache.get("localhost:6379", "Test"), LoadState::Loaded);
    }

    #[test]
    fn endpoints_do_not_interfere() {
        let cache = ShaCache::new();
        cache.mark_loaded("a:6379", "Test");
        assert_eq!(cache.get("b:6379", "Test"), LoadState::Unknown);
        cache.mark_stale("b:6379", "Test");
        assert_eq!(cache.get("a:6379", "Test"), LoadState::Loaded);
    }

    #[test]
    fn names_do_not_interfere() {
        let cache = ShaCache::new();
        cache.mark_loaded("a:6379", "One");
        assert_eq!(cache.get("a:6379", "Two"), LoadState::Unknown);
    }
}
