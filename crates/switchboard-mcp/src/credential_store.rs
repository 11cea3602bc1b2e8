// crates/switchboard-mcp/src/credential_store.rs
// ============================================================================
// Module: File Credential Store
// Description: Session file persistence with atomic, versioned writes.
// Purpose: Share the login session between the CLI and running servers.
// Dependencies: serde_json, switchboard-core, tempfile
// ============================================================================

//! ## Overview
//! [`FileCredentialStore`] persists the [`Session`] as a JSON document of the
//! form `{ "version": n, "session": { ... } }`. Other top-level keys written by
//! other tools are preserved on every write.
//!
//! ## Invariants
//! - Writes land in a temp file in the target directory and are renamed into
//!   place, so readers never observe a partially written file.
//! - On Unix the session file is created with mode `0600`.
//! - Every write bumps `version`. [`CredentialStore::write_session_at`] fails
//!   with [`CredentialStoreError::Conflict`] when the on-disk version no longer
//!   matches the snapshot the caller read. Plain reads keep no state, so
//!   concurrent resolutions cannot mask an external write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use switchboard_config::SessionConfig;
use switchboard_core::CredentialStore;
use switchboard_core::CredentialStoreError;
use switchboard_core::Session;
use switchboard_core::SessionSnapshot;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Top-level key holding the document version.
const VERSION_KEY: &str = "version";
/// Top-level key holding the session record.
const SESSION_KEY: &str = "session";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Session store backed by a JSON file.
#[derive(Debug)]
pub struct FileCredentialStore {
    /// Session file location.
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store for the given session file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Creates a store at the configured (or default) session file path.
    ///
    /// # Errors
    ///
    /// Returns [`switchboard_config::ConfigError`] when no path can be resolved.
    pub fn from_config(config: &SessionConfig) -> Result<Self, switchboard_config::ConfigError> {
        Ok(Self::new(config.resolve_path()?))
    }

    /// Returns the session file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces or removes the session entry, bumping the version.
    ///
    /// With `expected` set, the write is refused when the on-disk version
    /// differs from it.
    fn update(
        &self,
        session: Option<&Session>,
        expected: Option<u64>,
    ) -> Result<(), CredentialStoreError> {
        let mut document = read_document(&self.path)?.unwrap_or_default();
        let current = document_version(&document);
        if let Some(expected) = expected
            && expected != current
        {
            return Err(CredentialStoreError::Conflict(format!(
                "session file {} changed (version {expected} -> {current})",
                self.path.display()
            )));
        }
        match session {
            Some(session) => {
                let value = serde_json::to_value(session)
                    .map_err(|err| CredentialStoreError::Parse(err.to_string()))?;
                document.insert(SESSION_KEY.to_string(), value);
            }
            None => {
                document.remove(SESSION_KEY);
            }
        }
        document.insert(VERSION_KEY.to_string(), Value::from(current.saturating_add(1)));
        write_document(&self.path, &document)
    }
}

impl CredentialStore for FileCredentialStore {
    fn read_session(&self) -> Result<Option<Session>, CredentialStoreError> {
        Ok(self.read_for_update()?.session)
    }

    fn write_session(&self, session: &Session) -> Result<(), CredentialStoreError> {
        self.update(Some(session), None)
    }

    fn clear_session(&self) -> Result<(), CredentialStoreError> {
        self.update(None, None)
    }

    fn read_for_update(&self) -> Result<SessionSnapshot, CredentialStoreError> {
        let Some(mut document) = read_document(&self.path)? else {
            return Ok(SessionSnapshot::default());
        };
        let version = document_version(&document);
        let session = match document.remove(SESSION_KEY) {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value)
                    .map_err(|err| CredentialStoreError::Parse(err.to_string()))?,
            ),
        };
        Ok(SessionSnapshot {
            session,
            version,
        })
    }

    fn write_session_at(
        &self,
        session: &Session,
        expected_version: u64,
    ) -> Result<(), CredentialStoreError> {
        self.update(Some(session), Some(expected_version))
    }
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Reads the session document; a missing file is `None`.
fn read_document(path: &Path) -> Result<Option<Map<String, Value>>, CredentialStoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CredentialStoreError::Io(err.to_string())),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(CredentialStoreError::Parse("session file must be a JSON object".to_string())),
        Err(err) => Err(CredentialStoreError::Parse(err.to_string())),
    }
}

/// Returns the document version, treating a missing or malformed value as 0.
fn document_version(document: &Map<String, Value>) -> u64 {
    document.get(VERSION_KEY).and_then(Value::as_u64).unwrap_or(0)
}

/// Writes the document atomically with owner-only permissions.
fn write_document(path: &Path, document: &Map<String, Value>) -> Result<(), CredentialStoreError> {
    let dir = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
    create_private_dir(dir)?;
    let mut bytes = serde_json::to_vec_pretty(document)
        .map_err(|err| CredentialStoreError::Parse(err.to_string()))?;
    bytes.push(b'\n');

    let mut temp =
        NamedTempFile::new_in(dir).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|err| CredentialStoreError::Io(err.to_string()))?;
    }
    temp.write_all(&bytes).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
    temp.as_file().sync_all().map_err(|err| CredentialStoreError::Io(err.to_string()))?;
    temp.persist(path).map_err(|err| CredentialStoreError::Io(err.error.to_string()))?;
    Ok(())
}

/// Creates the session directory, owner-only on Unix.
fn create_private_dir(dir: &Path) -> Result<(), CredentialStoreError> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|err| CredentialStoreError::Io(err.to_string()))
}
