use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{CommandError, ScriptError};
use crate::provider::{ConnectionProvider, ScriptConnection};
use crate::registry::ScriptRegistry;
use crate::sha_cache::{LoadState, ShaCache};
use crate::value::{Reply, ScriptArg};

/// Orchestrates the script registry, per-endpoint load-state cache, and a
/// [`ConnectionProvider`] to execute registered scripts via the server-side
/// cached-script protocol.
///
/// Holds no per-call state of its own; any number of tasks may call
/// [`eval_single`](Self::eval_single) concurrently for the same or
/// different addresses. Duplicate loads for the same (address, name) pair
/// under contention are tolerated rather than serialized: loading the same
/// body twice yields the same hash and is harmless.
pub struct ScriptPool<P> {
    provider: P,
    registry: ScriptRegistry,
    shas: ShaCache,
}

impl<P: ConnectionProvider> ScriptPool<P> {
    /// Create a pool over the given connection provider with an empty
    /// registry.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            registry: ScriptRegistry::new(),
            shas: ShaCache::new(),
        }
    }

    /// Register a script from inline source text.
    pub fn register(&self, name: &str, body: &str) {
        self.registry.register(name, body);
    }

    /// Register a script by reading its source from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Io`] with the underlying error untouched if
    /// the file cannot be read.
    pub async fn register_file(&self, name: &str, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        self.registry.register_file(name, path).await
    }

    /// The underlying registry, for callers that pre-load scripts in bulk.
    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    /// Execute registered script `name` against the endpoint at `address`.
    ///
    /// `args` follows the evaluate convention (key count, keys, then plain
    /// arguments) and is passed through unvalidated. The raw reply is
    /// returned without interpretation.
    ///
    /// If the server reports the script unknown, the body is reloaded and
    /// the evaluation retried exactly once; a second miss after a fresh
    /// load fails with [`ScriptError::ReloadExhausted`].
    ///
    /// # Errors
    ///
    /// [`ScriptError::NotRegistered`] if `name` was never registered (no
    /// network call is made); [`ScriptError::Connection`] if no usable
    /// connection could be obtained; [`ScriptError::Runtime`] for any
    /// server-reported script error, verbatim and unretried.
    #[instrument(skip(self, args), fields(op = "eval_single"))]
    pub async fn eval_single(
        &self,
        address: &str,
        name: &str,
        args: &[ScriptArg],
    ) -> Result<Reply, ScriptError> {
        let Some(script) = self.registry.lookup(name) else {
            return Err(ScriptError::NotRegistered {
                address: address.to_owned(),
                name: name.to_owned(),
            });
        };

        let mut conn =
            self.provider
                .connection(address)
                .await
                .map_err(|e| ScriptError::Connection {
                    address: address.to_owned(),
                    detail: e.to_string(),
                })?;

        if self.shas.get(address, name) == LoadState::Loaded {
            match conn.eval_sha(script.hash(), args).await {
                Ok(reply) => return Ok(reply),
                Err(CommandError::NoScript) => {
                    // Server restart or cache eviction; fall through to the
                    // single load-then-retry cycle.
                    self.shas.mark_stale(address, name);
                    debug!(address = %address, script = %name, "script evicted on server, reloading");
                }
                Err(e) => return Err(command_error(address, name, e)),
            }
        }

        self.load_and_eval(conn.as_mut(), address, script.hash(), script.body(), name, args)
            .await
    }

    /// The load-then-evaluate path, executed at most once per call.
    async fn load_and_eval(
        &self,
        conn: &mut dyn ScriptConnection,
        address: &str,
        hash: &str,
        body: &str,
        name: &str,
        args: &[ScriptArg],
    ) -> Result<Reply, ScriptError> {
        let server_hash = conn
            .script_load(body)
            .await
            .map_err(|e| command_error(address, name, e))?;
        if server_hash != hash {
            // The protocol guarantees SHA-1 agreement; a mismatch means the
            // server is not speaking the script-cache protocol we expect.
            return Err(ScriptError::Runtime {
                address: address.to_owned(),
                name: name.to_owned(),
                detail: format!("server returned hash {server_hash}, expected {hash}"),
            });
        }
        self.shas.mark_loaded(address, name);

        match conn.eval_sha(hash, args).await {
            Ok(reply) => Ok(reply),
            Err(CommandError::NoScript) => {
                self.shas.mark_stale(address, name);
                warn!(address = %address, script = %name, "script unknown to server after fresh load");
                Err(ScriptError::ReloadExhausted {
                    address: address.to_owned(),
                    name: name.to_owned(),
                    detail: "server reported script unknown after a fresh load".to_owned(),
                })
            }
            Err(e) => Err(command_error(address, name, e)),
        }
    }
}

/// Attach address and script context to a seam-level failure.
fn command_error(address: &str, name: &str, err: CommandError) -> ScriptError {
    match err {
        CommandError::Connection(detail) => ScriptError::Connection {
            address: address.to_owned(),
            detail,
        },
        CommandError::NoScript | CommandError::Server(_) => ScriptError::Runtime {
            address: address.to_owned(),
            name: name.to_owned(),
            detail: err.to_string(),
        },
    }
}
