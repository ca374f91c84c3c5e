use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use sha1::{Digest, Sha1};

use crate::error::ScriptError;

/// A registered Lua script: its caller-chosen name, raw source body, and
/// the SHA-1 content hash the server uses as its identifier.
///
/// Immutable once created; re-registering a name replaces the whole entry.
#[derive(Debug)]
pub struct LuaScript {
    name: String,
    body: String,
    hash: String,
}

impl LuaScript {
    fn new(name: &str, body: &str) -> Self {
        Self {
            name: name.to_owned(),
            body: body.to_owned(),
            hash: content_hash(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Lowercase hex SHA-1 of the body, identical to what `SCRIPT LOAD`
    /// returns for the same source.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Compute the lowercase hex SHA-1 digest of a script body.
#[must_use]
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory store of named Lua script sources, independent of any
/// network endpoint.
///
/// Effectively write-once per name at startup; lookups are pure and
/// lock-free on the read path.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: DashMap<String, Arc<LuaScript>>,
}

impl ScriptRegistry {
    /// Create a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script from inline source text. An existing entry under
    /// the same name is replaced wholesale.
    pub fn register(&self, name: &str, body: &str) {
        self.scripts
            .insert(name.to_owned(), Arc::new(LuaScript::new(name, body)));
    }

    /// Register a script by reading its source from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Io`] with the underlying error untouched if
    /// the file cannot be read. Nothing is registered on failure.
    pub async fn register_file(&self, name: &str, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let body = tokio::fs::read_to_string(path).await?;
        self.register(name, &body);
        Ok(())
    }

    /// Look up a registered script by name. Pure; no I/O, no network.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<LuaScript>> {
        self.scripts.get(name).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "return KEYS[1]..KEYS[2]..ARGV[1]..ARGV[2]..22";

    #[test]
    fn register_then_lookup() {
        let registry = ScriptRegistry::new();
        registry.register("Test", BODY);

        let script = registry.lookup("Test").expect("script should be present");
        assert_eq!(script.name(), "Test");
        assert_eq!(script.body(), BODY);
        assert_eq!(script.hash(), content_hash(BODY));
    }

    #[test]
    fn lookup_missing_returns_none() {
        let registry = ScriptRegistry::new();
        assert!(registry.lookup("Nothave").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash(BODY), content_hash(BODY));
        assert_ne!(content_hash(BODY), content_hash("return 1"));
        // 40 hex chars, as EVALSHA expects.
        assert_eq!(content_hash(BODY).len(), 40);
        assert_eq!(content_hash(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn reregistration_replaces_entry() {
        let registry = ScriptRegistry::new();
        registry.register("Test", "return 1");
        registry.register("Test", BODY);

        let script = registry.lookup("Test").expect("script should be present");
        assert_eq!(script.body(), BODY);
        assert_eq!(script.hash(), content_hash(BODY));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn register_file_missing_surfaces_io_error() {
        let registry = ScriptRegistry::new();
        let err = registry
            .register_file("Test", "./test.luad")
            .await
            .expect_err("missing file should fail");
        match err {
            ScriptError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {other:?}"),
        }
        assert!(registry.lookup("Test").is_none());
    }

    #[tokio::test]
    async fn register_file_reads_source() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("luapool-registry-{}.lua", std::process::id()));
        tokio::fs::write(&path, BODY).await.expect("write temp file");

        let registry = ScriptRegistry::new();
        registry
            .register_file("Test", &path)
            .await
            .expect("registration should succeed");
        let script = registry.lookup("Test").expect("script should be present");
        assert_eq!(script.body(), BODY);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
