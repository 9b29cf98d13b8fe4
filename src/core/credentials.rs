//! Credential staging and durable scratch storage
//!
//! SSID and password arrive through two independent characteristic writes.
//! Each write lands in the in-memory [`CredentialStage`] and in a plaintext
//! scratch file; the provisioning workflow only ever reads the files.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::{
    error::{ScratchError, ScratchResult},
    types::ScratchKey,
};

/// Default scratch file for the last written SSID
pub const DEFAULT_SSID_FILE: &str = "/tmp/ssid.txt";

/// Default scratch file for the last written password
pub const DEFAULT_PASSWORD_FILE: &str = "/tmp/password.txt";

/// Most recently written SSID and password
///
/// The two fields are set independently and never reset, so a run may pick
/// up a value left over from an earlier session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CredentialStage {
    ssid: Option<Vec<u8>>,
    password: Option<Vec<u8>>,
}

impl CredentialStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ScratchKey, value: Vec<u8>) {
        match key {
            ScratchKey::Ssid => self.ssid = Some(value),
            ScratchKey::Password => self.password = Some(value),
        }
    }

    pub fn ssid(&self) -> Option<&[u8]> {
        self.ssid.as_deref()
    }

    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }
}

/// Plaintext key/value files holding the staged credentials
///
/// Values are overwritten on each write and read back verbatim.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    ssid_path: PathBuf,
    password_path: PathBuf,
}

impl ScratchStore {
    pub fn new(ssid_path: impl Into<PathBuf>, password_path: impl Into<PathBuf>) -> Self {
        Self {
            ssid_path: ssid_path.into(),
            password_path: password_path.into(),
        }
    }

    pub fn path(&self, key: ScratchKey) -> &Path {
        match key {
            ScratchKey::Ssid => &self.ssid_path,
            ScratchKey::Password => &self.password_path,
        }
    }

    /// Replace the stored value for `key`
    pub async fn persist(&self, key: ScratchKey, value: &[u8]) -> ScratchResult<()> {
        let path = self.path(key);
        tokio::fs::write(path, value)
            .await
            .map_err(|source| ScratchError::Write {
                path: path.display().to_string(),
                source,
            })?;

        debug!("Persisted {} ({} bytes) to {}", key, value.len(), path.display());
        Ok(())
    }

    /// Read back the stored value for `key`
    pub async fn load(&self, key: ScratchKey) -> ScratchResult<Vec<u8>> {
        let path = self.path(key);
        tokio::fs::read(path)
            .await
            .map_err(|source| ScratchError::Read {
                path: path.display().to_string(),
                source,
            })
    }
}

impl Default for ScratchStore {
    fn default() -> Self {
        Self::new(DEFAULT_SSID_FILE, DEFAULT_PASSWORD_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn temp_store(dir: &tempfile::TempDir) -> ScratchStore {
        ScratchStore::new(dir.path().join("ssid"), dir.path().join("password"))
    }

    #[test]
    fn test_stage_fields_are_independent() {
        let mut stage = CredentialStage::new();
        assert_eq!(stage.ssid(), None);
        assert_eq!(stage.password(), None);

        stage.set(ScratchKey::Password, b"secret123".to_vec());
        assert_eq!(stage.ssid(), None);
        assert_eq!(stage.password(), Some(&b"secret123"[..]));

        stage.set(ScratchKey::Ssid, b"HomeNet".to_vec());
        stage.set(ScratchKey::Ssid, b"OtherNet".to_vec());
        assert_eq!(stage.ssid(), Some(&b"OtherNet"[..]));
        assert_eq!(stage.password(), Some(&b"secret123"[..]));
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        assert_ok!(store.persist(ScratchKey::Ssid, b"HomeNet").await);
        assert_ok!(store.persist(ScratchKey::Password, b"secret123").await);

        assert_eq!(store.load(ScratchKey::Ssid).await.unwrap(), b"HomeNet");
        assert_eq!(store.load(ScratchKey::Password).await.unwrap(), b"secret123");
    }

    #[tokio::test]
    async fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        store.persist(ScratchKey::Ssid, b"AVeryLongNetworkName").await.unwrap();
        store.persist(ScratchKey::Ssid, b"Short").await.unwrap();

        assert_eq!(store.load(ScratchKey::Ssid).await.unwrap(), b"Short");
    }

    #[tokio::test]
    async fn test_values_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        store.persist(ScratchKey::Password, b" pass\n").await.unwrap();
        assert_eq!(store.load(ScratchKey::Password).await.unwrap(), b" pass\n");

        store.persist(ScratchKey::Password, b"").await.unwrap();
        assert!(store.load(ScratchKey::Password).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let result = store.load(ScratchKey::Ssid).await;
        assert!(matches!(result, Err(ScratchError::Read { .. })));
    }

    #[tokio::test]
    async fn test_persist_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(
            dir.path().join("missing/ssid"),
            dir.path().join("missing/password"),
        );

        let result = store.persist(ScratchKey::Ssid, b"HomeNet").await;
        assert!(matches!(result, Err(ScratchError::Write { .. })));
    }
}
