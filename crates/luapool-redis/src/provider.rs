use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::{Config, Pool, Runtime};
use tracing::debug;

use luapool::{CommandError, ConnectionProvider, Reply, ScriptArg, ScriptConnection};

use crate::config::RedisPoolConfig;

/// [`ConnectionProvider`] backed by one `deadpool-redis` pool per endpoint
/// address.
///
/// Pools are created lazily on first reference to an address and kept for
/// the provider's lifetime; `max_size` and `wait_timeout` come from
/// [`RedisPoolConfig`]. There is no active health checking — a connection
/// that fails a command with an I/O-class error is detached from its pool
/// instead of being recycled, and a fresh one is opened on next demand.
pub struct RedisScriptProvider {
    config: RedisPoolConfig,
    pools: DashMap<String, Pool>,
}

impl RedisScriptProvider {
    /// Create a provider with the given pool configuration.
    #[must_use]
    pub fn new(config: &RedisPoolConfig) -> Self {
        Self {
            config: config.clone(),
            pools: DashMap::new(),
        }
    }

    /// Get or lazily create the pool for `address` (`host:port`).
    fn pool_for(&self, address: &str) -> Result<Pool, CommandError> {
        if let Some(pool) = self.pools.get(address) {
            return Ok(pool.clone());
        }

        let cfg = Config::from_url(format!("redis://{address}"));
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(self.config.capacity)
                    .wait_timeout(Some(self.config.wait_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| CommandError::Connection(e.to_string()))?
            .map_err(|e| CommandError::Connection(e.to_string()))?;
        debug!(address = %address, capacity = self.config.capacity, "created connection pool");

        // Racing first references may each build a pool; the first insert
        // wins and the losers' pools are dropped unused.
        let entry = self.pools.entry(address.to_owned()).or_insert(pool);
        Ok(entry.clone())
    }
}

#[async_trait]
impl ConnectionProvider for RedisScriptProvider {
    async fn connection(&self, address: &str) -> Result<Box<dyn ScriptConnection>, CommandError> {
        let pool = self.pool_for(address)?;
        let conn = pool
            .get()
            .await
            .map_err(|e| CommandError::Connection(e.to_string()))?;
        Ok(Box::new(PooledScriptConnection {
            conn: Some(conn),
            in_flight: false,
        }))
    }
}

/// A pooled connection that returns to its pool on drop unless tainted.
///
/// Tainted means either a command failed at the transport level or the
/// connection was dropped with a command still in flight (caller
/// cancellation); in both cases the protocol state is indeterminate and
/// the connection is detached from the pool instead of recycled.
struct PooledScriptConnection {
    conn: Option<deadpool_redis::Connection>,
    in_flight: bool,
}

impl PooledScriptConnection {
    fn conn_mut(&mut self) -> Result<&mut deadpool_redis::Connection, CommandError> {
        self.conn
            .as_mut()
            .ok_or_else(|| CommandError::Connection("connection already discarded".to_owned()))
    }

    /// Detach the connection from its pool; the raw connection closes on
    /// drop.
    fn discard(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = deadpool_redis::Connection::take(conn);
        }
    }

    /// Classify a command failure by structured error kind, never by
    /// message text. Transport-level failures taint the connection.
    fn classify(&mut self, err: redis::RedisError) -> CommandError {
        if err.kind() == redis::ErrorKind::NoScriptError {
            return CommandError::NoScript;
        }
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
            || err.is_unrecoverable_error()
        {
            self.discard();
            return CommandError::Connection(err.to_string());
        }
        CommandError::Server(err.to_string())
    }
}

impl Drop for PooledScriptConnection {
    fn drop(&mut self) {
        if self.in_flight {
            self.discard();
        }
    }
}

#[async_trait]
impl ScriptConnection for PooledScriptConnection {
    async fn script_load(&mut self, body: &str) -> Result<String, CommandError> {
        self.in_flight = true;
        let conn = self.conn_mut()?;
        let result = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(body)
            .query_async::<String>(conn)
            .await;
        self.in_flight = false;
        result.map_err(|e| self.classify(e))
    }

    async fn eval_sha(&mut self, hash: &str, args: &[ScriptArg]) -> Result<Reply, CommandError> {
        let mut cmd = redis::cmd("EVALSHA");
        cmd.arg(hash);
        for arg in args {
            match arg {
                ScriptArg::Int(n) => cmd.arg(*n),
                ScriptArg::Str(s) => cmd.arg(s.as_str()),
                ScriptArg::Bytes(b) => cmd.arg(b.as_slice()),
            };
        }

        self.in_flight = true;
        let conn = self.conn_mut()?;
        let result = cmd.query_async::<redis::Value>(conn).await;
        self.in_flight = false;
        match result {
            Ok(value) => reply_from_value(value),
            Err(e) => Err(self.classify(e)),
        }
    }
}

/// Convert a raw protocol value into the backend-agnostic [`Reply`].
fn reply_from_value(value: redis::Value) -> Result<Reply, CommandError> {
    match value {
        redis::Value::Nil => Ok(Reply::Nil),
        redis::Value::Int(n) => Ok(Reply::Int(n)),
        redis::Value::BulkString(bytes) => Ok(Reply::Data(bytes)),
        redis::Value::SimpleString(s) => Ok(Reply::Status(s)),
        redis::Value::Okay => Ok(Reply::Status("OK".to_owned())),
        redis::Value::Array(items) => items
            .into_iter()
            .map(reply_from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Array),
        other => Err(CommandError::Server(format!(
            "unsupported reply type: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_conversion_covers_script_return_types() {
        assert_eq!(reply_from_value(redis::Value::Nil).unwrap(), Reply::Nil);
        assert_eq!(reply_from_value(redis::Value::Int(22)).unwrap(), Reply::Int(22));
        assert_eq!(
            reply_from_value(redis::Value::BulkString(b"key1key2".to_vec())).unwrap(),
            Reply::Data(b"key1key2".to_vec())
        );
        assert_eq!(
            reply_from_value(redis::Value::Okay).unwrap(),
            Reply::Status("OK".to_owned())
        );
        assert_eq!(
            reply_from_value(redis::Value::Array(vec![
                redis::Value::Int(1),
                redis::Value::BulkString(b"a".to_vec()),
            ]))
            .unwrap(),
            Reply::Array(vec![Reply::Int(1), Reply::Data(b"a".to_vec())])
        );
    }

    #[test]
    fn unsupported_reply_is_a_server_error() {
        let err = reply_from_value(redis::Value::Double(1.5))
            .expect_err("doubles are not produced by the script protocol");
        assert!(matches!(err, CommandError::Server(_)));
    }
}
