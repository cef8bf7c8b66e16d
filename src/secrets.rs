//! Durable session credential stores (OS keyring or a file in the data dir).

use keyring::{Entry, Error as KeyringError};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use issuedesk_api::credentials::normalize_token;
use issuedesk_api::{ApiError, CredentialStore, MemoryCredentialStore};

use crate::config::{project_dirs, CredentialBackend};

const KEYRING_SERVICE: &str = "dev.issuedesk.cli";
const KEYRING_ACCOUNT: &str = "session";
const KEYRING_CHECK_ACCOUNT: &str = "availability-check";
const KEYRING_CHECK_VALUE: &str = "issuedesk";
const CREDENTIAL_FILE_NAME: &str = "credential";

/// Keeps the session token in the OS keyring, with a process-local cache in front of it.
pub struct KeyringCredentialStore {
    service: String,
    cache: Mutex<Option<String>>,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            cache: Mutex::new(None),
        }
    }

    fn entry(&self) -> Result<Entry, ApiError> {
        Entry::new(&self.service, KEYRING_ACCOUNT)
            .map_err(|err| ApiError::Credential(format!("Failed to open keyring entry: {err}")))
    }

    /// Writes, reads back and deletes a marker entry. Fails when the keyring cannot hold a secret.
    pub fn check_available(&self) -> Result<(), ApiError> {
        let entry = Entry::new(&self.service, KEYRING_CHECK_ACCOUNT)
            .map_err(|err| ApiError::Credential(format!("Failed to open keyring entry: {err}")))?;
        entry
            .set_password(KEYRING_CHECK_VALUE)
            .map_err(|err| ApiError::Credential(format!("Keyring rejected a write: {err}")))?;
        let read_back = entry.get_password();
        let _ = entry.delete_credential();
        match read_back {
            Ok(value) if value == KEYRING_CHECK_VALUE => Ok(()),
            Ok(_) => Err(ApiError::Credential(
                "Keyring returned a different value than was stored".to_string(),
            )),
            Err(err) => Err(ApiError::Credential(format!(
                "Keyring lost a value right after storing it: {err}"
            ))),
        }
    }

    fn load_from_keyring(&self) -> Result<Option<String>, ApiError> {
        match self.entry()?.get_password() {
            Ok(secret) if secret.trim().is_empty() => Ok(None),
            Ok(secret) => Ok(Some(secret)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(ApiError::Credential(format!(
                "Failed to read session from keyring: {err}"
            ))),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Option<String> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.is_some() {
            return cache.clone();
        }
        match self.load_from_keyring() {
            Ok(token) => {
                *cache = token.clone();
                token
            }
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), ApiError> {
        let token = normalize_token(token)?;
        self.entry()?
            .set_password(&token)
            .map_err(|err| ApiError::Credential(format!("Failed to store session in keyring: {err}")))?;
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(err) => Err(ApiError::Credential(format!(
                "Failed to delete session from keyring: {err}"
            ))),
        }
    }
}

/// Keeps the session token in a single file; for hosts without a usable keyring.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new() -> Result<Self, ApiError> {
        let dirs = project_dirs().map_err(ApiError::Credential)?;
        Ok(Self::at(dirs.data_dir().join(CREDENTIAL_FILE_NAME)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("Failed to read {}: {}", self.path.display(), err);
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), ApiError> {
        let token = normalize_token(token)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ApiError::Io(err)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<(), ApiError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<(), ApiError> {
    Ok(())
}

/// Keeps the keyring only when `keyring_check` succeeds; otherwise the file store takes over.
fn resolve_backend(
    requested: CredentialBackend,
    keyring_check: impl FnOnce() -> Result<(), ApiError>,
) -> CredentialBackend {
    match requested {
        CredentialBackend::File => CredentialBackend::File,
        CredentialBackend::Keyring => match keyring_check() {
            Ok(()) => CredentialBackend::Keyring,
            Err(err) => {
                log::warn!("Keyring unavailable, storing the session in a file instead: {}", err);
                CredentialBackend::File
            }
        },
    }
}

/// Opens the configured durable store, or a memory store for `--ephemeral` runs.
pub fn open_credential_store(
    backend: CredentialBackend,
    ephemeral: bool,
) -> Result<Arc<dyn CredentialStore>, ApiError> {
    if ephemeral {
        return Ok(Arc::new(MemoryCredentialStore::new()));
    }
    let keyring = KeyringCredentialStore::new();
    match resolve_backend(backend, || keyring.check_available()) {
        CredentialBackend::Keyring => Ok(Arc::new(keyring)),
        CredentialBackend::File => Ok(Arc::new(FileCredentialStore::new()?)),
    }
}
