//! Refresh token persistence.
//!
//! The login flow only ever needs three operations from a backend: read the
//! stored refresh token, replace it, and erase it. [`CredentialStore`]
//! captures that contract; the backends below implement it.
//!
//! - [`FileCredentialStore`] keeps the token in a JSON file in the local data
//!   directory. This is the default.
//! - [`KeyringCredentialStore`] uses the system keyring (`keyring` feature).
//! - [`MemoryCredentialStore`] keeps it in memory and counts writes, for tests.
//! - [`EnvOverrideStore`] wraps any backend so that a token supplied through
//!   the environment wins over stored state.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AuthError, Result};

pub const SERVICE_NAME: &str = "spock";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>>;

    async fn set(&self, refresh_token: &str) -> Result<()>;

    /// Removing a token that does not exist is not an error.
    async fn delete(&self) -> Result<()>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn get(&self) -> Result<Option<String>> {
        (**self).get().await
    }
    async fn set(&self, refresh_token: &str) -> Result<()> {
        (**self).set(refresh_token).await
    }
    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    async fn get(&self) -> Result<Option<String>> {
        (**self).get().await
    }
    async fn set(&self, refresh_token: &str) -> Result<()> {
        (**self).set(refresh_token).await
    }
    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    refresh_token: String,
}

/// Stores the refresh token as JSON under the local data directory.
///
/// Default location:
/// - Linux: `~/.local/share/spock/credentials.json`
/// - macOS: `~/Library/Application Support/spock/credentials.json`
/// - Windows: `%LOCALAPPDATA%/spock/credentials.json`
///
/// On Unix the file is created with mode `0600`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spock/credentials.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, action: &str, e: impl std::fmt::Display) -> AuthError {
        AuthError::Storage(format!(
            "Failed to {action} '{}': {e}",
            self.path.display()
        ))
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<String>> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_err("read", e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let stored: StoredCredential =
            serde_json::from_str(&content).map_err(|e| self.storage_err("parse", e))?;
        Ok(Some(stored.refresh_token))
    }

    async fn set(&self, refresh_token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_err("create directory for", e))?;
        }

        let json = serde_json::to_string_pretty(&StoredCredential {
            refresh_token: refresh_token.to_string(),
        })
        .map_err(|e| self.storage_err("serialize", e))?;

        // Write beside the target and rename, so a crash never leaves half a token.
        let temp_path = self.path.with_extension("tmp");
        // A leftover from an interrupted write may carry wider permissions.
        match async_fs::remove_file(&temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.storage_err("remove stale", e)),
        }

        let mut options = async_fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use async_fs::unix::OpenOptionsExt;
            options.mode(0o600);
        }

        // The file now exists with restricted permissions; `write` truncates
        // it in place and keeps the mode.
        options
            .open(&temp_path)
            .await
            .map_err(|e| self.storage_err("open", e))?;
        async_fs::write(&temp_path, json)
            .await
            .map_err(|e| self.storage_err("write", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            async_fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.storage_err("restrict", e))?;
        }

        async_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.storage_err("replace", e))?;
        debug!(store = self.name(), "refresh token saved");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(store = self.name(), "refresh token removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_err("remove", e)),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Stores the refresh token in the system keyring under
/// service `spock`, key `refresh_token`.
#[cfg(feature = "keyring")]
#[derive(Debug, Default, Clone)]
pub struct KeyringCredentialStore;

#[cfg(feature = "keyring")]
impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self
    }

    /// Runs a keyring call on the blocking pool; platform keyrings may do
    /// synchronous IPC.
    async fn with_entry<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> std::result::Result<T, keyring::Error> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            keyring::Entry::new(SERVICE_NAME, REFRESH_TOKEN_KEY).and_then(op)
        })
        .await
        .map_err(|e| AuthError::Storage(format!("keyring task failed: {e}")))?
        .map_err(|e| AuthError::Storage(format!("keyring: {e}")))
    }
}

#[cfg(feature = "keyring")]
#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self) -> Result<Option<String>> {
        self.with_entry(|entry| match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, refresh_token: &str) -> Result<()> {
        let refresh_token = refresh_token.to_string();
        self.with_entry(move |entry| entry.set_password(&refresh_token))
            .await?;
        debug!(store = self.name(), "refresh token saved");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }

    fn name(&self) -> &str {
        "keyring"
    }
}

/// In-memory store. Counts `set` calls so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
    sets: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(refresh_token.into())),
            sets: AtomicUsize::new(0),
        }
    }

    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn set(&self, refresh_token: &str) -> Result<()> {
        *self.token.lock().await = Some(refresh_token.to_string());
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Lets a refresh token from the environment take precedence over `inner`.
///
/// Only `get` is affected; `set` and `delete` always go to the wrapped store.
#[derive(Debug)]
pub struct EnvOverrideStore<S> {
    inner: S,
    override_token: Option<String>,
}

impl<S: CredentialStore> EnvOverrideStore<S> {
    pub fn new(inner: S, override_token: Option<String>) -> Self {
        Self {
            inner,
            override_token: override_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CredentialStore> CredentialStore for EnvOverrideStore<S> {
    async fn get(&self) -> Result<Option<String>> {
        if let Some(token) = &self.override_token {
            return Ok(Some(token.clone()));
        }
        self.inner.get().await
    }

    async fn set(&self, refresh_token: &str) -> Result<()> {
        self.inner.set(refresh_token).await
    }

    async fn delete(&self) -> Result<()> {
        self.inner.delete().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// The store the CLI uses: keyring when built with the `keyring` feature,
/// the JSON file otherwise, with the environment override on top.
pub fn default_store(override_token: Option<String>) -> EnvOverrideStore<Box<dyn CredentialStore>> {
    #[cfg(feature = "keyring")]
    let inner: Box<dyn CredentialStore> = Box::new(KeyringCredentialStore::new());
    #[cfg(not(feature = "keyring"))]
    let inner: Box<dyn CredentialStore> = Box::new(FileCredentialStore::default());

    EnvOverrideStore::new(inner, override_token)
}
