use der::Encode;
use der::asn1::{BitString, GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::params::{ExtensionParam, Validity};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::error::{PkiError, Result};
use crate::key::{KeyPair, PublicKey};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: u64,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number: SerialNumber = SerialNumber::new(&self.serial_number.to_be_bytes())?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Signs the TBS structure with `signing_key` and returns the parsed
    /// certificate.
    ///
    /// The assembled certificate is DER-encoded and decoded again so the
    /// returned value is exactly what a consumer reading the bytes would see.
    pub fn sign(&self, signing_key: &KeyPair) -> Result<Certificate> {
        let tbs_certificate = self.to_tbs_certificate_inner()?;
        let signature = signing_key.sign_data(&tbs_certificate.to_der()?)?;

        let cert_inner: CertificateInner = CertificateInner {
            tbs_certificate,
            signature_algorithm: self.signature_algorithm.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        let der = cert_inner
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))?;
        Certificate::from_der(&der)
    }
}

/// RFC 5280 section 4.1.2.5: UTCTime through 2049, GeneralizedTime afterwards.
fn to_x509_time(value: OffsetDateTime) -> Result<Time> {
    let date_time = der::DateTime::from_system_time(value.into())
        .map_err(|e| PkiError::CertificateError(format!("invalid certificate time: {e}")))?;
    if date_time.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(date_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

pub(crate) fn from_x509_time(value: &Time) -> OffsetDateTime {
    match value {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
