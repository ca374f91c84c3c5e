//! Redis backend for the `luapool` script evaluator.
//!
//! Implements [`luapool::ConnectionProvider`] over per-address
//! `deadpool-redis` pools:
//!
//! - **Lazy pools**: an address's pool is created on first reference and
//!   reused for the provider's lifetime.
//! - **Bounded capacity**: `max_size` connections per address with a
//!   bounded acquisition wait; exhaustion surfaces as a connection error,
//!   never an unbounded block.
//! - **Taint handling**: a connection that fails at the transport level,
//!   or is dropped with a command in flight, is detached from its pool
//!   rather than recycled.
//! - **Structured NOSCRIPT detection**: eviction is recognized via
//!   `redis::ErrorKind::NoScriptError`, not by matching message text.
//!
//! # Example
//!
//! ```ignore
//! use luapool::{ScriptArg, ScriptPool};
//! use luapool_redis::{RedisPoolConfig, RedisScriptProvider};
//!
//! let pool = ScriptPool::new(RedisScriptProvider::new(&RedisPoolConfig::new(10)));
//! pool.register("Test", "return KEYS[1]..KEYS[2]..ARGV[1]..ARGV[2]..22");
//! let reply = pool.eval_single("localhost:6379", "Test", &args).await?;
//! ```
//!
//! Integration tests against a live server are gated behind the
//! `integration` feature and read `REDIS_ADDR` from the environment.

mod config;
mod provider;

pub use config::RedisPoolConfig;
pub use provider::RedisScriptProvider;

/// A [`luapool::ScriptPool`] over the Redis backend.
pub type RedisScriptPool = luapool::ScriptPool<RedisScriptProvider>;
