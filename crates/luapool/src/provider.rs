use async_trait::async_trait;

use crate::error::CommandError;
use crate::value::{Reply, ScriptArg};

/// A single live connection capable of the two script-cache protocol steps.
///
/// Implementations own their pooling behavior: dropping a healthy
/// connection returns it to its pool, while a connection that reported
/// [`CommandError::Connection`] must be discarded, not recycled.
#[async_trait]
pub trait ScriptConnection: Send {
    /// Submit script source to the server's script cache; returns the
    /// server-computed content hash.
    async fn script_load(&mut self, body: &str) -> Result<String, CommandError>;

    /// Execute a previously loaded script by hash with the raw
    /// key-count/keys/argv argument vector.
    async fn eval_sha(&mut self, hash: &str, args: &[ScriptArg]) -> Result<Reply, CommandError>;
}

/// Hands out pooled connections per endpoint address, creating an
/// address's pool lazily on first reference.
///
/// Acquisition blocks while the address's pool is at capacity, up to a
/// backend-configured bounded wait; exhaustion and establishment failures
/// surface as [`CommandError::Connection`]. No internal retry.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connection(&self, address: &str) -> Result<Box<dyn ScriptConnection>, CommandError>;
}
