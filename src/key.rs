use std::fmt;

use const_oid::ObjectIdentifier;
use der::Encode;
use ecdsa::signature::{Signer, Verifier};
use pkcs8::{DecodePrivateKey, DecodePublicKey, PrivateKeyInfo};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    pkcs1v15,
    signature::SignatureEncoding,
};
use sha2::Sha256;
use tracing::debug;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{PkiError, Result};

/// RSA modulus size used for every generated RSA key.
pub const RSA_KEY_SIZE: usize = 2048;

/// PEM label for PKCS#1 RSA private keys.
pub const RSA_PRIVATE_KEY_BLOCK_TYPE: &str = "RSA PRIVATE KEY";
/// PEM label for SEC1 EC private keys.
pub const EC_PRIVATE_KEY_BLOCK_TYPE: &str = "EC PRIVATE KEY";
/// PEM label for PKCS#8 private keys.
pub const PRIVATE_KEY_BLOCK_TYPE: &str = "PRIVATE KEY";

const UNSUPPORTED_KEY: &str = "the private key file is neither in RSA nor ECDSA format";

/// Key algorithms that can be generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA with a [`RSA_KEY_SIZE`]-bit modulus.
    #[default]
    Rsa,
    /// ECDSA over NIST P-256.
    Ecdsa,
}

/// Supported key types for certificate operations.
///
/// P-384 and P-521 keys are never generated; those variants exist so that CA
/// keys on these curves can be loaded and used to sign.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: p256::ecdsa::SigningKey,
        verifying_key: p256::ecdsa::VerifyingKey,
    },
    EcdsaP384 {
        signing_key: p384::ecdsa::SigningKey,
        verifying_key: p384::ecdsa::VerifyingKey,
    },
    EcdsaP521 {
        secret: p521::SecretKey,
        public: p521::PublicKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            KeyPair::Rsa { .. } => "Rsa",
            KeyPair::EcdsaP256 { .. } => "EcdsaP256",
            KeyPair::EcdsaP384 { .. } => "EcdsaP384",
            KeyPair::EcdsaP521 { .. } => "EcdsaP521",
        };
        f.debug_struct("KeyPair").field("kind", &kind).finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a key pair for the given algorithm.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        let key = match algorithm {
            KeyAlgorithm::Rsa => Self::generate_rsa(RSA_KEY_SIZE)?,
            KeyAlgorithm::Ecdsa => Self::generate_ecdsa_p256(),
        };
        debug!(?algorithm, "generated private key");
        Ok(key)
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| PkiError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = p256::ecdsa::SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Returns the public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::EcdsaP521 { public, .. } => PublicKey::EcdsaP521(*public),
        }
    }

    /// Signs `data`, hashing it with the digest tied to the key type.
    ///
    /// RSA produces a PKCS#1 v1.5 signature over SHA-256; ECDSA produces a
    /// DER-encoded `Ecdsa-Sig-Value` as X.509 expects, hashed with SHA-256,
    /// SHA-384 or SHA-512 for P-256, P-384 and P-521.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature = rsa::signature::Signer::try_sign(&signing_key, data)
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP521 { secret, .. } => {
                let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                let signature: p521::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }

    /// Encodes the private key in its canonical form, returning the PEM label
    /// and DER body: PKCS#1 for RSA, SEC1 for ECDSA.
    pub fn to_private_key_der(&self) -> Result<(&'static str, Vec<u8>)> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let document = private.to_pkcs1_der()?;
                Ok((RSA_PRIVATE_KEY_BLOCK_TYPE, document.as_bytes().to_vec()))
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let secret = p256::SecretKey::from_bytes(&signing_key.to_bytes())
                    .map_err(|e| PkiError::EncodingError(e.to_string()))?;
                let der = secret.to_sec1_der()?;
                Ok((EC_PRIVATE_KEY_BLOCK_TYPE, der.to_vec()))
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let secret = p384::SecretKey::from_bytes(&signing_key.to_bytes())
                    .map_err(|e| PkiError::EncodingError(e.to_string()))?;
                let der = secret.to_sec1_der()?;
                Ok((EC_PRIVATE_KEY_BLOCK_TYPE, der.to_vec()))
            }
            KeyPair::EcdsaP521 { secret, .. } => {
                let der = secret.to_sec1_der()?;
                Ok((EC_PRIVATE_KEY_BLOCK_TYPE, der.to_vec()))
            }
        }
    }

    /// Decodes a private key from a PEM block's label and DER body.
    ///
    /// Returns `Ok(None)` when the label is not a private key label, so that
    /// callers scanning a multi-block PEM file can skip it.
    pub fn from_pem_block(label: &str, der: &[u8]) -> Result<Option<Self>> {
        let key = match label {
            RSA_PRIVATE_KEY_BLOCK_TYPE => Self::from_pkcs1_der(der)?,
            EC_PRIVATE_KEY_BLOCK_TYPE => Self::from_sec1_der(der)?,
            PRIVATE_KEY_BLOCK_TYPE => Self::from_pkcs8_der(der)?,
            _ => return Ok(None),
        };
        Ok(Some(key))
    }

    /// Imports a PKCS#1 `RSAPrivateKey`.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private = RsaPrivateKey::from_pkcs1_der(der)?;
        Ok(Self::from_rsa(private))
    }

    /// Imports a SEC1 `ECPrivateKey`. The curve is taken from the embedded
    /// named-curve parameters.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        let ec_key = sec1::EcPrivateKey::try_from(der)
            .map_err(|e| PkiError::DecodingError(e.to_string()))?;
        let curve = ec_key
            .parameters
            .and_then(|params| params.named_curve())
            .ok_or_else(|| {
                PkiError::UnsupportedKey("EC private key is missing curve parameters".to_string())
            })?;

        match curve {
            const_oid::db::rfc5912::SECP_256_R_1 => {
                let secret = p256::SecretKey::from_sec1_der(der)
                    .map_err(|e| PkiError::DecodingError(e.to_string()))?;
                Ok(Self::from_p256(secret))
            }
            const_oid::db::rfc5912::SECP_384_R_1 => {
                let secret = p384::SecretKey::from_sec1_der(der)
                    .map_err(|e| PkiError::DecodingError(e.to_string()))?;
                Ok(Self::from_p384(secret))
            }
            const_oid::db::rfc5912::SECP_521_R_1 => {
                let secret = p521::SecretKey::from_sec1_der(der)
                    .map_err(|e| PkiError::DecodingError(e.to_string()))?;
                Ok(Self::from_p521(secret))
            }
            other => Err(PkiError::UnsupportedKey(format!(
                "unsupported EC curve OID: {other}"
            ))),
        }
    }

    /// Imports a PKCS#8 `PrivateKeyInfo`, accepting only RSA and ECDSA keys.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        let oid = info.algorithm.oid;

        if oid == const_oid::db::rfc5912::RSA_ENCRYPTION {
            let private = RsaPrivateKey::from_pkcs8_der(der)?;
            return Ok(Self::from_rsa(private));
        }

        if oid == const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
            let curve = info
                .algorithm
                .parameters
                .map(ObjectIdentifier::try_from)
                .transpose()?
                .ok_or_else(|| {
                    PkiError::UnsupportedKey("EC key is missing curve parameters".to_string())
                })?;
            return match curve {
                const_oid::db::rfc5912::SECP_256_R_1 => {
                    Ok(Self::from_p256(p256::SecretKey::from_pkcs8_der(der)?))
                }
                const_oid::db::rfc5912::SECP_384_R_1 => {
                    Ok(Self::from_p384(p384::SecretKey::from_pkcs8_der(der)?))
                }
                const_oid::db::rfc5912::SECP_521_R_1 => {
                    Ok(Self::from_p521(p521::SecretKey::from_pkcs8_der(der)?))
                }
                other => Err(PkiError::UnsupportedKey(format!(
                    "unsupported EC curve OID: {other}"
                ))),
            };
        }

        Err(PkiError::UnsupportedKey(format!(
            "{UNSUPPORTED_KEY} (algorithm OID {oid})"
        )))
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    fn from_p256(secret: p256::SecretKey) -> Self {
        let signing_key = p256::ecdsa::SigningKey::from(secret);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    fn from_p384(secret: p384::SecretKey) -> Self {
        let signing_key = p384::ecdsa::SigningKey::from(secret);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    fn from_p521(secret: p521::SecretKey) -> Self {
        let public = secret.public_key();
        KeyPair::EcdsaP521 { secret, public }
    }
}

/// Public half of a [`KeyPair`], as carried in a certificate.
#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    EcdsaP384(p384::ecdsa::VerifyingKey),
    EcdsaP521(p521::PublicKey),
}

impl PublicKey {
    /// Converts the key into a `SubjectPublicKeyInfo` for embedding in a certificate.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())?,
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)?
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)?
            }
            PublicKey::EcdsaP521(public) => SubjectPublicKeyInfoOwned::from_key(*public)?,
        };
        Ok(spki)
    }

    /// Reads a public key out of a certificate's `SubjectPublicKeyInfo`.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        let oid = spki.algorithm.oid;

        if oid == const_oid::db::rfc5912::RSA_ENCRYPTION {
            let public = RsaPublicKey::from_public_key_der(&der)?;
            return Ok(PublicKey::Rsa(public));
        }

        if oid == const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .map(|params| params.decode_as::<ObjectIdentifier>())
                .transpose()?;
            return match curve {
                Some(const_oid::db::rfc5912::SECP_256_R_1) => Ok(PublicKey::EcdsaP256(
                    p256::ecdsa::VerifyingKey::from_public_key_der(&der)?,
                )),
                Some(const_oid::db::rfc5912::SECP_384_R_1) => Ok(PublicKey::EcdsaP384(
                    p384::ecdsa::VerifyingKey::from_public_key_der(&der)?,
                )),
                Some(const_oid::db::rfc5912::SECP_521_R_1) => Ok(PublicKey::EcdsaP521(
                    p521::PublicKey::from_public_key_der(&der)?,
                )),
                _ => Err(PkiError::UnsupportedKey(
                    "unsupported EC public key curve".to_string(),
                )),
            };
        }

        Err(PkiError::UnsupportedKey(format!(
            "unsupported public key algorithm OID: {oid}"
        )))
    }

    /// Checks `signature` over `data` as produced by [`KeyPair::sign_data`].
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let invalid = |e: ecdsa::signature::Error| PkiError::SigningError(e.to_string());
        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                let signature = pkcs1v15::Signature::try_from(signature)
                    .map_err(|e| PkiError::SigningError(e.to_string()))?;
                rsa::signature::Verifier::verify(&verifying_key, data, &signature)
                    .map_err(|e| PkiError::SigningError(e.to_string()))
            }
            PublicKey::EcdsaP256(verifying_key) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(data, &signature).map_err(invalid)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(data, &signature).map_err(invalid)
            }
            PublicKey::EcdsaP521(public) => {
                use p521::elliptic_curve::sec1::ToEncodedPoint;
                let verifying_key =
                    p521::ecdsa::VerifyingKey::from_sec1_bytes(public.to_encoded_point(false).as_bytes())
                        .map_err(invalid)?;
                let signature = p521::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(data, &signature).map_err(invalid)
            }
        }
    }
}
