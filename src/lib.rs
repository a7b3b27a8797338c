//! # chaosd-pki - Certificate issuance for the chaosd agent
//!
//! chaosd-pki lets an agent bootstrap a TLS identity trusted by a known
//! certificate authority without operator-driven certificate tooling. Given a
//! CA certificate and its private key it mints a fresh key pair and a
//! certificate signed by that CA, and moves both to and from PEM on disk.
//! It is built entirely with rustcrypto libraries.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048-bit keys (the default for generated keys)
//! - **ECDSA**: P-256 for generated keys; CA keys on P-256, P-384 or P-521 can be loaded
//!
//! Other private key algorithms, such as Ed25519, are rejected when parsed.
//!
//! ## Issued Certificates
//!
//! Every issued certificate carries the chaosd identity:
//!
//! - Subject `CN=chaosd.chaos-mesh.org`
//! - DNS names `chaosd.chaos-mesh.org` and `localhost`
//! - `notBefore` equal to the CA's own `notBefore`, valid for five years
//! - Key usage `DigitalSignature | KeyEncipherment`, plus `KeyCertSign` for CAs
//! - A random 63-bit serial number
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use chaosd_pki::issuer::{CertificateAuthority, Issuer};
//! use chaosd_pki::store::{CHAOSD_PKI_NAME, FileStore, PkiStore};
//!
//! # fn main() -> Result<(), chaosd_pki::error::PkiError> {
//! let ca = CertificateAuthority::from_pem(
//!     &std::fs::read("/etc/chaosd/ca.crt").unwrap(),
//!     &std::fs::read("/etc/chaosd/ca.key").unwrap(),
//! )?;
//!
//! let (cert, key) = ca.new_cert_and_key()?;
//!
//! let store = PkiStore::new(FileStore::new());
//! store.write(Path::new("/var/lib/chaosd/pki"), CHAOSD_PKI_NAME, Some(&cert), Some(&key))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::PkiError`]. Errors crossing an
//! operation boundary are wrapped with a short description of what failed:
//!
//! ```rust
//! use chaosd_pki::{codec, error::PkiError};
//!
//! match codec::parse_private_key(b"invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(PkiError::UnsupportedKey(msg)) => println!("Not an RSA or ECDSA key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, key encodings and signing
//! - [`cert`]: Certificate values, extensions and issuance parameters
//! - [`issuer`]: Certificate signing by a CA
//! - [`codec`]: PEM encoding and parsing of certificates and keys
//! - [`store`]: Persisting certificate/key pairs as `{name}.crt` and `{name}.key`
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure manipulation

pub mod cert;
pub mod codec;
pub mod error;
pub mod issuer;
pub mod key;
pub mod store;
pub mod tbs_certificate;
