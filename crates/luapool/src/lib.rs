//! Core abstractions for pooled Redis Lua script execution.
//!
//! This crate implements the registry + load-state + evaluate contract:
//!
//! - **Registry**: named Lua script sources with SHA-1 content hashes,
//!   registered once at startup ([`ScriptRegistry`]).
//! - **Load-state cache**: per (address, script) belief about whether the
//!   script is present in that endpoint's server-side cache ([`ShaCache`]).
//! - **Evaluator**: [`ScriptPool`] runs a registered script against a
//!   caller-chosen endpoint via the cached-script protocol (load once,
//!   execute by hash) and transparently reloads on eviction — exactly one
//!   load-then-retry cycle per call.
//!
//! The network side sits behind the [`ConnectionProvider`] /
//! [`ScriptConnection`] traits; `luapool-redis` supplies the
//! `deadpool-redis` backend, and [`testing`] supplies in-memory doubles.
//!
//! Address selection (sharding, cluster topology) is a caller concern:
//! only the single-address evaluate operation is exposed.
//!
//! # Example
//!
//! ```ignore
//! use luapool::ScriptPool;
//! use luapool_redis::{RedisPoolConfig, RedisScriptProvider};
//!
//! let pool = ScriptPool::new(RedisScriptProvider::new(&RedisPoolConfig::default()));
//! pool.register("Test", "return KEYS[1]..KEYS[2]..ARGV[1]..ARGV[2]..22");
//! let reply = pool.eval_single("localhost:6379", "Test", &args).await?;
//! ```

mod error;
mod pool;
mod provider;
mod registry;
mod sha_cache;
pub mod testing;
mod value;

pub use error::{CommandError, ScriptError};
pub use pool::ScriptPool;
pub use provider::{ConnectionProvider, ScriptConnection};
pub use registry::{content_hash, LuaScript, ScriptRegistry};
pub use sha_cache::{LoadState, ShaCache};
pub use value::{Reply, ScriptArg};
