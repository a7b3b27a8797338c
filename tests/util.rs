#![allow(dead_code)]

use chaosd_pki::cert::SignatureAlgorithm;
use chaosd_pki::cert::extensions::{BasicConstraints, KeyUsage, KeyUsages};
use chaosd_pki::cert::params::{ExtensionParam, Validity, name_from_common_name};
use chaosd_pki::issuer::{CertificateAuthority, random_serial_number};
use chaosd_pki::key::{KeyAlgorithm, KeyPair};
use chaosd_pki::tbs_certificate::TbsCertificate;
use time::{Duration, OffsetDateTime};

pub const CA_COMMON_NAME: &str = "chaosd-ca.chaos-mesh.org";

/// Start of validity for test CAs: an hour ago, whole seconds.
pub fn an_hour_ago() -> OffsetDateTime {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .unwrap()
        - Duration::hours(1)
}

/// Builds a self-signed CA whose validity started an hour ago.
pub fn generate_ca_cert(algorithm: KeyAlgorithm) -> CertificateAuthority {
    generate_ca_cert_at(algorithm, an_hour_ago())
}

pub fn generate_ca_cert_at(
    algorithm: KeyAlgorithm,
    not_before: OffsetDateTime,
) -> CertificateAuthority {
    ca_from_key(KeyPair::generate(algorithm).unwrap(), not_before, Vec::new())
}

/// Self-signs a CA certificate for `ca_key`, appending `extra_extensions`
/// after basic constraints and key usage.
pub fn ca_from_key(
    ca_key: KeyPair,
    not_before: OffsetDateTime,
    extra_extensions: Vec<ExtensionParam>,
) -> CertificateAuthority {
    let subject = name_from_common_name(CA_COMMON_NAME).unwrap();

    let mut extensions = vec![
        ExtensionParam::from_extension(
            BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            true,
        )
        .unwrap(),
        ExtensionParam::from_extension(
            KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature),
            true,
        )
        .unwrap(),
    ];
    extensions.extend(extra_extensions);

    let tbs = TbsCertificate {
        serial_number: random_serial_number().unwrap(),
        signature_algorithm: SignatureAlgorithm::for_key(&ca_key),
        issuer: subject.clone(),
        validity: Validity::starting_at(not_before, Duration::days(3650)).unwrap(),
        subject,
        subject_public_key: ca_key.public_key(),
        extensions,
    };

    let cert = tbs.sign(&ca_key).unwrap();
    CertificateAuthority::new(cert, ca_key)
}

/// A P-384 key loaded through its SEC1 encoding.
pub fn p384_key() -> KeyPair {
    let secret = p384::SecretKey::random(&mut rand_core::OsRng);
    KeyPair::from_sec1_der(&secret.to_sec1_der().unwrap()).unwrap()
}

/// A P-521 key loaded through its SEC1 encoding.
pub fn p521_key() -> KeyPair {
    let secret = p521::SecretKey::random(&mut rand_core::OsRng);
    KeyPair::from_sec1_der(&secret.to_sec1_der().unwrap()).unwrap()
}
