pub mod extensions;
pub mod params;

use der::asn1::{Any, AnyRef};
use der::{Decode, Encode};
use extensions::{BasicConstraints, KeyUsage, SubjectAltName, ToAndFromX509Extension};
use params::Validity;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::error::{PkiError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::from_x509_time;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    Sha512WithECDSA,
}

impl SignatureAlgorithm {
    /// The algorithm a given key signs with.
    pub fn for_key(key: &KeyPair) -> Self {
        match key {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::EcdsaP521 { .. } => SignatureAlgorithm::Sha512WithECDSA,
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters (RFC 4055); ECDSA omits them
    /// (RFC 5758).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::from(AnyRef::NULL)),
            },
            SignatureAlgorithm::Sha256WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            SignatureAlgorithm::Sha512WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
                parameters: None,
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// Immutable once created: it is always built by decoding DER, and the DER
/// it was decoded from is kept alongside the parsed structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
    raw: Vec<u8>,
}

impl Certificate {
    /// Decodes a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| PkiError::DecodingError(format!("invalid certificate: {e}")))?;
        Ok(Self {
            inner,
            raw: der.to_vec(),
        })
    }

    /// The signed DER encoding of the certificate.
    pub fn as_der(&self) -> &[u8] {
        &self.raw
    }

    /// Encodes the certificate into a PEM `CERTIFICATE` block.
    pub fn to_pem(&self) -> Vec<u8> {
        crate::codec::encode_cert_pem(self)
    }

    /// Big-endian serial number bytes, as encoded in the certificate.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// Serial number as lowercase hex, for diagnostics.
    pub fn serial_number_hex(&self) -> String {
        self.serial_number()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// The subject's common name, if present.
    pub fn common_name(&self) -> Option<String> {
        params::common_name_of(self.subject())
    }

    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: from_x509_time(&validity.not_before),
            not_after: from_x509_time(&validity.not_after),
        }
    }

    /// DNS names from the Subject Alternative Name extension; empty when the
    /// extension is absent.
    pub fn dns_names(&self) -> Result<Vec<String>> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|san| san.names)
            .unwrap_or_default())
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension::<KeyUsage>()
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        self.extension::<BasicConstraints>()
    }

    /// Whether basic constraints are present and mark this certificate as a CA.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self.basic_constraints()?.is_some_and(|bc| bc.is_ca))
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Decodes the first extension of type `E`, if the certificate carries one.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Checks that this certificate's signature was produced by the key
    /// certified in `issuer`.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        if self.inner.signature_algorithm != self.inner.tbs_certificate.signature {
            return Err(PkiError::SigningError(
                "outer and inner signature algorithms differ".to_string(),
            ));
        }
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            PkiError::SigningError("signature has unused bits".to_string())
        })?;
        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))?;
        issuer.public_key()?.verify(&tbs, signature)
    }
}
