//! Persistence of certificates and keys as `{name}.crt` / `{name}.key` blobs.
//!
//! [`PkiStore`] maps a `(directory, name)` pair onto blob paths and writes
//! PEM through a [`BlobStore`]. [`PkiStore::write`] is not transactional:
//! the key is written first, and if writing the certificate then fails the
//! key blob stays behind. Re-issuing under the same name overwrites both.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use tracing::debug;

use crate::cert::Certificate;
use crate::codec;
use crate::error::{PkiError, Result};
use crate::key::KeyPair;

/// Default logical name of the chaosd certificate/key pair.
pub const CHAOSD_PKI_NAME: &str = "chaosd";

/// What a blob holds; file-backed stores derive permissions from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Certificate,
    PrivateKey,
}

/// Key-value blob storage addressed by path.
pub trait BlobStore: Send + Sync {
    /// Writes `contents` to `path`, replacing any existing blob.
    fn write(&self, path: &Path, contents: &[u8], kind: BlobKind) -> io::Result<()>;

    /// Reads the blob stored at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Filesystem-backed blob store.
///
/// Parent directories are created as needed. Certificates are written with
/// mode `0644` and private keys with `0600` on unix; the key mode is applied
/// to pre-existing files as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl BlobStore for FileStore {
    fn write(&self, path: &Path, contents: &[u8], kind: BlobKind) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(file_mode(kind));
        }

        let mut file = options.open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if kind == BlobKind::PrivateKey {
                file.set_permissions(fs::Permissions::from_mode(file_mode(kind)))?;
            }
        }
        file.write_all(contents)?;
        file.sync_all()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(unix)]
fn file_mode(kind: BlobKind) -> u32 {
    match kind {
        BlobKind::Certificate => 0o644,
        BlobKind::PrivateKey => 0o600,
    }
}

fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

/// In-memory blob store.
///
/// Every accessor reports a poisoned lock as an [`io::Error`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<Blobs>,
}

type Blobs = HashMap<PathBuf, (BlobKind, Vec<u8>)>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> io::Result<RwLockReadGuard<'_, Blobs>> {
        self.blobs
            .read()
            .map_err(|_| io::Error::other("memory store lock poisoned"))
    }

    /// Kind of the blob at `path`, if one was written.
    pub fn kind(&self, path: &Path) -> io::Result<Option<BlobKind>> {
        Ok(self.blobs()?.get(path).map(|(kind, _)| *kind))
    }

    pub fn len(&self) -> io::Result<usize> {
        Ok(self.blobs()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl BlobStore for MemoryStore {
    fn write(&self, path: &Path, contents: &[u8], kind: BlobKind) -> io::Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        blobs.insert(path.to_path_buf(), (kind, contents.to_vec()));
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.blobs()?
            .get(path)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "blob not found"))
    }
}

/// Path of the certificate blob for `name` under `pki_path`.
pub fn cert_path(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.crt"))
}

/// Path of the private key blob for `name` under `pki_path`.
pub fn key_path(pki_path: &Path, name: &str) -> PathBuf {
    pki_path.join(format!("{name}.key"))
}

/// Writes and loads certificate/key pairs through a [`BlobStore`].
#[derive(Debug, Default)]
pub struct PkiStore<S> {
    store: S,
}

impl<S: BlobStore> PkiStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying blob store.
    pub fn blob_store(&self) -> &S {
        &self.store
    }

    /// Stores a certificate and key at the specified location, key first.
    pub fn write(
        &self,
        pki_path: &Path,
        name: &str,
        cert: Option<&Certificate>,
        key: Option<&KeyPair>,
    ) -> Result<()> {
        if cert.is_none() {
            return Err(PkiError::InvalidInput(
                "certificate cannot be empty when writing to the store".to_string(),
            ));
        }
        self.write_key(pki_path, name, key)
            .map_err(|e| e.context("couldn't write key"))?;
        self.write_cert(pki_path, name, cert)
    }

    /// Stores the given certificate at `{pki_path}/{name}.crt`.
    pub fn write_cert(&self, pki_path: &Path, name: &str, cert: Option<&Certificate>) -> Result<()> {
        let cert = cert.ok_or_else(|| {
            PkiError::InvalidInput(
                "certificate cannot be empty when writing to the store".to_string(),
            )
        })?;

        let path = cert_path(pki_path, name);
        self.store
            .write(&path, &codec::encode_cert_pem(cert), BlobKind::Certificate)
            .map_err(|source| PkiError::StorageError {
                operation: "write certificate to file",
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), serial = %cert.serial_number_hex(), "wrote certificate");
        Ok(())
    }

    /// Stores the given private key at `{pki_path}/{name}.key`.
    pub fn write_key(&self, pki_path: &Path, name: &str, key: Option<&KeyPair>) -> Result<()> {
        let key = key.ok_or_else(|| {
            PkiError::InvalidInput(
                "private key cannot be empty when writing to the store".to_string(),
            )
        })?;

        let path = key_path(pki_path, name);
        let encoded = codec::encode_private_key_pem(key)
            .map_err(|e| e.context("unable to marshal private key to PEM"))?;
        self.store
            .write(&path, &encoded, BlobKind::PrivateKey)
            .map_err(|source| PkiError::StorageError {
                operation: "write private key to file",
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "wrote private key");
        Ok(())
    }

    /// Loads the certificate and key stored under `name`.
    pub fn load(&self, pki_path: &Path, name: &str) -> Result<(Certificate, KeyPair)> {
        let cert_file = cert_path(pki_path, name);
        let cert_data = self
            .store
            .read(&cert_file)
            .map_err(|source| PkiError::StorageError {
                operation: "read certificate from file",
                path: cert_file.clone(),
                source,
            })?;

        let key_file = key_path(pki_path, name);
        let key_data = self
            .store
            .read(&key_file)
            .map_err(|source| PkiError::StorageError {
                operation: "read private key from file",
                path: key_file.clone(),
                source,
            })?;

        codec::parse_cert_and_key(&cert_data, &key_data)
    }
}
