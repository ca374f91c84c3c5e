use thiserror::Error;

/// Errors surfaced by script registration and evaluation.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The caller evaluated a name that was never registered. Detected
    /// locally; no network call is made. The display string is a legacy
    /// contract consumed by existing operators and must not change.
    #[error("get lua sha1 add:{address} key:{name} err:lua not find")]
    NotRegistered { address: String, name: String },

    /// Reading a script source file failed during registration. The
    /// underlying I/O error is surfaced verbatim, not wrapped.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usable connection to the endpoint could not be obtained or kept.
    #[error("connection error add:{address}: {detail}")]
    Connection { address: String, detail: String },

    /// The server still reported the script unknown after a fresh load.
    /// Signals a server-side inconsistency; never retried further.
    #[error("script reload exhausted add:{address} key:{name}: {detail}")]
    ReloadExhausted {
        address: String,
        name: String,
        detail: String,
    },

    /// The script itself raised an error when executed. Passed through
    /// verbatim and never retried (scripts may have side effects).
    #[error("script error add:{address} key:{name}: {detail}")]
    Runtime {
        address: String,
        name: String,
        detail: String,
    },
}

/// Failure classification at the connection seam.
///
/// Backends translate their transport errors into these kinds so the
/// evaluator can match on structure rather than message text. `NoScript`
/// is the only internally-absorbed condition (it triggers the single
/// reload cycle); the rest map onto [`ScriptError`] with address and
/// script context attached.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The server has no script cached under the requested hash.
    #[error("script not found on server")]
    NoScript,

    /// The connection failed at the transport level. The backend must not
    /// return the connection to its pool.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other server-reported error (bad arguments, a `redis.error_reply`,
    /// a type error inside the script).
    #[error("{0}")]
    Server(String),
}
