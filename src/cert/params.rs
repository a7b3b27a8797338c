use std::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use time::{Duration, OffsetDateTime};
use x509_cert::name::{Name, RdnSequence};

use super::extensions::ToAndFromX509Extension;
use crate::error::PkiError;
use crate::key::KeyAlgorithm;

/// Common name placed in every issued certificate's subject.
pub const COMMON_NAME: &str = "chaosd.chaos-mesh.org";

/// DNS names placed in every issued certificate's Subject Alternative Name.
pub const DNS_NAMES: [&str; 2] = ["chaosd.chaos-mesh.org", "localhost"];

/// Validity of every signed certificate: five years.
pub const CERTIFICATE_VALIDITY: Duration = Duration::days(1825);

/// Identity and lifetime of the certificates an issuer mints.
///
/// The defaults are the fixed chaosd identity; the struct exists so the
/// values are injected once at construction instead of being scattered
/// through the signer.
///
/// # Fields
/// * `common_name` - Subject common name (CN).
/// * `dns_names` - DNS names for the Subject Alternative Name extension.
/// * `validity` - Lifetime measured from the CA's `notBefore`.
/// * `key_algorithm` - Algorithm of freshly generated leaf keys.
#[derive(Clone, Debug, Builder)]
pub struct IssuanceProfile {
    #[builder(into, default = COMMON_NAME.to_string())]
    pub common_name: String,
    #[builder(default = DNS_NAMES.iter().map(|name| name.to_string()).collect())]
    pub dns_names: Vec<String>,
    #[builder(default = CERTIFICATE_VALIDITY)]
    pub validity: Duration,
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
}

impl Default for IssuanceProfile {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl IssuanceProfile {
    /// Subject distinguished name carrying only the profile's common name.
    pub fn subject(&self) -> Result<Name, PkiError> {
        name_from_common_name(&self.common_name)
    }
}

/// Builds a distinguished name holding a single `CN` attribute.
pub fn name_from_common_name(common_name: &str) -> Result<Name, PkiError> {
    RdnSequence::from_str(&format!("CN={common_name}"))
        .map_err(|e| PkiError::InvalidInput(format!("invalid common name {common_name:?}: {e}")))
}

/// Returns the first common name attribute of `name`, if any.
pub fn common_name_of(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attr| attr.oid == const_oid::db::rfc4519::CN)
        .and_then(|attr| std::str::from_utf8(attr.value.value()).ok())
        .map(str::to_owned)
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period of `duration` starting at `not_before`.
    pub fn starting_at(not_before: OffsetDateTime, duration: Duration) -> Result<Self, PkiError> {
        let not_after = not_before.checked_add(duration).ok_or_else(|| {
            PkiError::CertificateError(format!(
                "validity of {duration} from {not_before} is out of range"
            ))
        })?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    pub fn duration(&self) -> Duration {
        self.not_after - self.not_before
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, PkiError> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_uses_chaosd_identity() {
        let profile = IssuanceProfile::default();
        assert_eq!(profile.common_name, "chaosd.chaos-mesh.org");
        assert_eq!(profile.dns_names, vec!["chaosd.chaos-mesh.org", "localhost"]);
        assert_eq!(profile.validity, Duration::days(1825));
        assert_eq!(profile.key_algorithm, KeyAlgorithm::Rsa);
    }

    #[test]
    fn test_profile_builder_overrides() {
        let profile = IssuanceProfile::builder()
            .common_name("agent.internal")
            .key_algorithm(KeyAlgorithm::Ecdsa)
            .build();
        assert_eq!(profile.common_name, "agent.internal");
        assert_eq!(profile.dns_names.len(), 2);
        assert_eq!(profile.key_algorithm, KeyAlgorithm::Ecdsa);
    }

    #[test]
    fn test_common_name_round_trip() {
        let name = name_from_common_name(COMMON_NAME).unwrap();
        assert_eq!(common_name_of(&name).as_deref(), Some(COMMON_NAME));
    }

    #[test]
    fn test_validity_starting_at() {
        let start = OffsetDateTime::from_unix_timestamp(1_600_000_000).unwrap();
        let validity = Validity::starting_at(start, CERTIFICATE_VALIDITY).unwrap();
        assert_eq!(validity.not_before, start);
        assert_eq!(validity.duration(), CERTIFICATE_VALIDITY);
    }
}
