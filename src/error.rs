//! use chaosd_pki::error::PkiError;

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, PkiError>;

/// Represents errors that can occur while issuing, encoding or storing
/// certificates and keys.
#[derive(Debug, Error)]
pub enum PkiError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The private key parsed, but its algorithm is neither RSA nor ECDSA
    /// (or uses a curve this crate cannot sign with).
    #[error("Unsupported key format: {0}")]
    UnsupportedKey(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The secure random source could not provide entropy.
    #[error("Random source error: {0}")]
    RandomSourceError(String),

    /// Error while producing or checking a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Error related to certificate contents.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from RSA PKCS1 operations.
    #[error("RSA PKCS1 error: {0}")]
    RsaPkcs1Error(String),

    /// I/O failure from the backing blob store.
    #[error("unable to {operation} {}: {source}", path.display())]
    StorageError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error wrapped with a description of the operation that failed.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PkiError>,
    },
}

impl PkiError {
    /// Wraps this error with a one-line description of the failed operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        PkiError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any `Context` wrappers.
    pub fn root_cause(&self) -> &PkiError {
        let mut current = self;
        while let PkiError::Context { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<der::Error> for PkiError {
    /// Converts a `der::Error` into a `PkiError`.
    fn from(err: der::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for PkiError {
    fn from(err: pem::PemError) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for PkiError {
    fn from(err: pkcs8::Error) -> Self {
        PkiError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for PkiError {
    fn from(err: pkcs8::spki::Error) -> Self {
        PkiError::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for PkiError {
    fn from(err: rsa::Error) -> Self {
        PkiError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for PkiError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        PkiError::RsaPkcs1Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_and_unwraps() {
        let err = PkiError::UnsupportedKey("ed25519".to_string())
            .context("parse ca key file failed")
            .context("load ca");
        assert_eq!(
            err.to_string(),
            "load ca: parse ca key file failed: Unsupported key format: ed25519"
        );
        assert!(matches!(err.root_cause(), PkiError::UnsupportedKey(_)));
    }

    #[test]
    fn test_storage_error_names_path() {
        let err = PkiError::StorageError {
            operation: "write certificate to file",
            path: PathBuf::from("/var/lib/chaosd/pki/chaosd.crt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "unable to write certificate to file /var/lib/chaosd/pki/chaosd.crt: denied"
        );
    }
}
