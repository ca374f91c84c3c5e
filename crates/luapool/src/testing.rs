//! Test doubles for the connection seam.
//!
//! [`MockProvider`] emulates a Redis script cache per address: `SCRIPT
//! LOAD` records the SHA-1 of the body, `EVALSHA` answers NOSCRIPT for
//! unknown hashes, and capacity is enforced with a semaphore so tests can
//! assert that concurrent callers never exceed the configured pool bound.
//! [`RejectingProvider`] panics on any contact and pins down code paths
//! that must not touch the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::CommandError;
use crate::provider::{ConnectionProvider, ScriptConnection};
use crate::registry::content_hash;
use crate::value::{Reply, ScriptArg};

/// How long a mock acquisition waits on an exhausted pool before failing
/// with a connection error.
const ACQUIRE_WAIT: Duration = Duration::from_millis(200);

type EvalHandler = dyn Fn(&str, &[ScriptArg]) -> Result<Reply, CommandError> + Send + Sync;

struct MockState {
    capacity: usize,
    permits: Arc<Semaphore>,
    /// Per-address set of script hashes the fake server has cached.
    loaded: DashMap<String, DashSet<String>>,
    loads: AtomicUsize,
    evals: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// When set, loads never stick: every `eval_sha` answers NOSCRIPT.
    always_evict: AtomicBool,
    eval_delay_ms: AtomicU64,
    handler: Box<EvalHandler>,
}

/// In-memory [`ConnectionProvider`] with a scriptable fake server.
#[derive(Clone)]
pub struct MockProvider {
    state: Arc<MockState>,
}

impl MockProvider {
    /// Create a provider whose fake pool holds `capacity` connections and
    /// whose scripts reply `OK`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_handler(capacity, |_, _| Ok(Reply::Status("OK".to_owned())))
    }

    /// Create a provider with a custom per-eval reply handler. The handler
    /// receives the script hash and the raw argument vector.
    pub fn with_handler<F>(capacity: usize, handler: F) -> Self
    where
        F: Fn(&str, &[ScriptArg]) -> Result<Reply, CommandError> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(MockState {
                capacity,
                permits: Arc::new(Semaphore::new(capacity)),
                loaded: DashMap::new(),
                loads: AtomicUsize::new(0),
                evals: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                always_evict: AtomicBool::new(false),
                eval_delay_ms: AtomicU64::new(0),
                handler: Box::new(handler),
            }),
        }
    }

    /// Drop every script the fake server has cached for `address`, as a
    /// server restart or `SCRIPT FLUSH` would.
    pub fn evict(&self, address: &str) {
        self.state.loaded.remove(address);
    }

    /// Simulate a server that never retains loaded scripts.
    pub fn set_always_evict(&self, value: bool) {
        self.state.always_evict.store(value, Ordering::SeqCst);
    }

    /// Delay each `eval_sha` so tests can observe connection concurrency.
    pub fn set_eval_delay(&self, delay: Duration) {
        self.state
            .eval_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    /// Number of `SCRIPT LOAD` calls observed across all addresses.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.state.loads.load(Ordering::SeqCst)
    }

    /// Number of successful `EVALSHA` executions observed.
    #[must_use]
    pub fn evals(&self) -> usize {
        self.state.evals.load(Ordering::SeqCst)
    }

    /// High-water mark of simultaneously held connections.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Configured pool capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }
}

#[async_trait]
impl ConnectionProvider for MockProvider {
    async fn connection(&self, address: &str) -> Result<Box<dyn ScriptConnection>, CommandError> {
        let permit = tokio::time::timeout(
            ACQUIRE_WAIT,
            Arc::clone(&self.state.permits).acquire_owned(),
        )
        .await
        .map_err(|_| CommandError::Connection(format!("pool exhausted for {address}")))?
        .map_err(|e| CommandError::Connection(e.to_string()))?;

        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            address: address.to_owned(),
            _permit: permit,
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
    address: String,
    _permit: OwnedSemaphorePermit,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScriptConnection for MockConnection {
    async fn script_load(&mut self, body: &str) -> Result<String, CommandError> {
        self.state.loads.fetch_add(1, Ordering::SeqCst);
        let hash = content_hash(body);
        if !self.state.always_evict.load(Ordering::SeqCst) {
            self.state
                .loaded
                .entry(self.address.clone())
                .or_default()
                .insert(hash.clone());
        }
        Ok(hash)
    }

    async fn eval_sha(&mut self, hash: &str, args: &[ScriptArg]) -> Result<Reply, CommandError> {
        let delay = self.state.eval_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let known = self
            .state
            .loaded
            .get(&self.address)
            .is_some_and(|hashes| hashes.contains(hash));
        if !known {
            return Err(CommandError::NoScript);
        }

        let reply = (self.state.handler)(hash, args)?;
        self.state.evals.fetch_add(1, Ordering::SeqCst);
        Ok(reply)
    }
}

/// A provider that fails the test if any connection is ever requested.
pub struct RejectingProvider;

#[async_trait]
impl ConnectionProvider for RejectingProvider {
    async fn connection(&self, address: &str) -> Result<Box<dyn ScriptConnection>, CommandError> {
        panic!("unexpected network activity for address {address}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_then_eval_round_trip() {
        let provider = MockProvider::new(1);
        let mut conn = provider
            .connection("localhost:6379")
            .await
            .expect("connection should be available");

        let hash = conn
            .script_load("return 1")
            .await
            .expect("load should succeed");
        assert_eq!(hash, content_hash("return 1"));

        let reply = conn
            .eval_sha(&hash, &[])
            .await
            .expect("eval of a loaded script should succeed");
        assert_eq!(reply, Reply::Status("OK".to_owned()));
    }

    #[tokio::test]
    async fn unloaded_hash_answers_noscript() {
        let provider = MockProvider::new(1);
        let mut conn = provider
            .connection("localhost:6379")
            .await
            .expect("connection should be available");

        let err = conn
            .eval_sha(&content_hash("return 1"), &[])
            .await
            .expect_err("unknown hash should fail");
        assert!(matches!(err, CommandError::NoScript));
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let provider = MockProvider::new(1);
        let held = provider
            .connection("localhost:6379")
            .await
            .expect("first connection should be available");

        match provider.connection("localhost:6379").await {
            Ok(_) => panic!("second acquisition should time out"),
            Err(err) => assert!(matches!(err, CommandError::Connection(_))),
        }

        drop(held);
        provider
            .connection("localhost:6379")
            .await
            .expect("released connection should be reusable");
    }
}
