use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::cert::Certificate;
use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectAltName, SubjectKeyIdentifier,
    key_identifier,
};
use crate::cert::params::{ExtensionParam, IssuanceProfile, Validity};
use crate::codec;
use crate::error::{PkiError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// Implementors supply the CA certificate, its key and the profile of the
/// certificates they mint; signing itself is provided.
pub trait Issuer {
    /// The certificate of the issuing CA.
    fn certificate(&self) -> &Certificate;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Identity and lifetime of issued certificates.
    fn profile(&self) -> &IssuanceProfile;

    /// Issues a certificate for `subject_key`.
    ///
    /// # Arguments
    /// * `subject_key` - Public key to certify.
    /// * `is_ca` - Whether the issued certificate may itself sign certificates.
    fn sign(&self, subject_key: &PublicKey, is_ca: bool) -> Result<Certificate> {
        sign_certificate(
            self.profile(),
            subject_key,
            self.certificate(),
            self.signing_key(),
            is_ca,
        )
    }

    /// Generates a fresh key with the profile's algorithm and issues a
    /// non-CA certificate for it.
    fn new_cert_and_key(&self) -> Result<(Certificate, KeyPair)> {
        let key = KeyPair::generate(self.profile().key_algorithm)
            .map_err(|e| e.context("unable to create private key"))?;
        let cert = self
            .sign(&key.public_key(), false)
            .map_err(|e| e.context("unable to sign certificate"))?;
        Ok((cert, key))
    }
}

/// A CA certificate paired with its private key.
///
/// The pair is loaded by the caller; this crate never persists it.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    pub cert: Certificate,
    pub key: KeyPair,
    pub profile: IssuanceProfile,
}

impl CertificateAuthority {
    /// Pairs a CA certificate and key, issuing with the default chaosd profile.
    pub fn new(cert: Certificate, key: KeyPair) -> Self {
        Self::with_profile(cert, key, IssuanceProfile::default())
    }

    pub fn with_profile(cert: Certificate, key: KeyPair, profile: IssuanceProfile) -> Self {
        Self { cert, key, profile }
    }

    /// Loads a CA from PEM-encoded certificate and key data.
    pub fn from_pem(cert_data: &[u8], key_data: &[u8]) -> Result<Self> {
        let (cert, key) = codec::parse_cert_and_key(cert_data, key_data)?;
        Ok(Self::new(cert, key))
    }
}

impl Issuer for CertificateAuthority {
    fn certificate(&self) -> &Certificate {
        &self.cert
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn profile(&self) -> &IssuanceProfile {
        &self.profile
    }
}

/// Creates a certificate for `key`, signed by the CA, using the default
/// chaosd profile.
pub fn new_signed_cert(
    key: &KeyPair,
    ca_cert: &Certificate,
    ca_key: &KeyPair,
    is_ca: bool,
) -> Result<Certificate> {
    sign_certificate(
        &IssuanceProfile::default(),
        &key.public_key(),
        ca_cert,
        ca_key,
        is_ca,
    )
}

/// Creates a new RSA key and a non-CA certificate for it, signed by the CA.
pub fn new_cert_and_key(ca_cert: &Certificate, ca_key: &KeyPair) -> Result<(Certificate, KeyPair)> {
    CertificateAuthority::new(ca_cert.clone(), ca_key.clone()).new_cert_and_key()
}

/// Draws a serial number uniformly from `[0, 2^63)`.
pub fn random_serial_number() -> Result<u64> {
    let value = OsRng
        .try_next_u64()
        .map_err(|e| PkiError::RandomSourceError(e.to_string()))?;
    Ok(value & (u64::MAX >> 1))
}

/// Builds, signs and re-parses a certificate for `subject_key`.
///
/// The validity window starts at the CA's own `notBefore` and lasts
/// `profile.validity`. The issuer name is copied from the CA's subject, and
/// the authority key identifier from the CA's subject key identifier when it
/// has one.
pub fn sign_certificate(
    profile: &IssuanceProfile,
    subject_key: &PublicKey,
    ca_cert: &Certificate,
    ca_key: &KeyPair,
    is_ca: bool,
) -> Result<Certificate> {
    let ca_public_key = ca_cert.public_key()?;
    if ca_public_key != ca_key.public_key() {
        return Err(PkiError::SigningError(
            "provided private key doesn't match the CA certificate's public key".to_string(),
        ));
    }

    let serial_number = random_serial_number()?;
    let validity = Validity::starting_at(ca_cert.validity().not_before, profile.validity)?;

    let subject_spki = subject_key.to_spki()?;
    let authority_key_id = match ca_cert.extension::<SubjectKeyIdentifier>()? {
        Some(ski) => ski.key_identifier,
        None => key_identifier(&ca_cert.inner.tbs_certificate.subject_public_key_info),
    };

    let extensions = vec![
        ExtensionParam::from_extension(KeyUsage::for_issued(is_ca), true)?,
        ExtensionParam::from_extension(
            BasicConstraints {
                is_ca,
                max_path_length: None,
            },
            true,
        )?,
        ExtensionParam::from_extension(
            SubjectKeyIdentifier {
                key_identifier: key_identifier(&subject_spki),
            },
            false,
        )?,
        ExtensionParam::from_extension(
            AuthorityKeyIdentifier {
                key_identifier: authority_key_id,
            },
            false,
        )?,
        ExtensionParam::from_extension(
            SubjectAltName {
                names: profile.dns_names.clone(),
            },
            false,
        )?,
    ];

    let tbs_cert = TbsCertificate {
        serial_number,
        signature_algorithm: SignatureAlgorithm::for_key(ca_key),
        issuer: ca_cert.subject().clone(),
        validity,
        subject: profile.subject()?,
        subject_public_key: subject_key.clone(),
        extensions,
    };

    let cert = tbs_cert.sign(ca_key)?;
    cert.verify_signed_by(ca_cert)
        .map_err(|e| e.context("signature over issued certificate is invalid"))?;

    debug!(
        serial = %cert.serial_number_hex(),
        is_ca,
        not_after = %validity.not_after,
        "signed certificate"
    );
    Ok(cert)
}
