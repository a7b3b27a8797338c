mod util;

use chaosd_pki::cert::Certificate;
use chaosd_pki::cert::extensions::SubjectKeyIdentifier;
use chaosd_pki::cert::params::ExtensionParam;
use chaosd_pki::codec;
use chaosd_pki::issuer::Issuer;
use chaosd_pki::key::{KeyAlgorithm, KeyPair};
use der::Encode;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509NameRef, X509StoreContext};

fn common_name(name: &X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .expect("common name")
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_parses_issued_cert() {
    for algorithm in [KeyAlgorithm::Rsa, KeyAlgorithm::Ecdsa] {
        let ca = util::generate_ca_cert(algorithm);
        let (cert, _key) = ca.new_cert_and_key().unwrap();

        let x509 = X509::from_pem(&cert.to_pem()).expect("openssl rejected certificate");
        let ca_x509 = X509::from_pem(&ca.cert.to_pem()).unwrap();

        assert_eq!(x509.version(), 2);
        assert_eq!(common_name(x509.subject_name()), "chaosd.chaos-mesh.org");
        assert_eq!(common_name(x509.issuer_name()), util::CA_COMMON_NAME);

        let dns_names: Vec<String> = x509
            .subject_alt_names()
            .expect("subject alternative names")
            .iter()
            .filter_map(|name| name.dnsname().map(str::to_string))
            .collect();
        assert_eq!(dns_names, ["chaosd.chaos-mesh.org", "localhost"]);

        let lifetime = x509.not_before().diff(x509.not_after()).unwrap();
        assert_eq!(lifetime.days, 1825);
        assert_eq!(lifetime.secs, 0);
        assert_eq!(x509.not_before(), ca_x509.not_before());

        assert!(x509.verify(&ca_x509.public_key().unwrap()).unwrap());
    }
}

fn openssl_verifies(ca: &Certificate, leaf: &Certificate) -> bool {
    let ca_x509 = X509::from_pem(&ca.to_pem()).unwrap();
    let leaf_x509 = X509::from_pem(&leaf.to_pem()).unwrap();

    let mut builder = X509StoreBuilder::new().unwrap();
    builder.add_cert(ca_x509).unwrap();
    let store = builder.build();

    let chain = Stack::new().unwrap();
    let mut context = X509StoreContext::new().unwrap();
    context
        .init(&store, &leaf_x509, &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                eprintln!("verification error: {}", c.error());
            }
            Ok(ok)
        })
        .unwrap()
}

#[test]
fn test_openssl_verifies_chain() {
    let cas = [
        util::generate_ca_cert(KeyAlgorithm::Rsa),
        util::generate_ca_cert(KeyAlgorithm::Ecdsa),
        util::ca_from_key(util::p384_key(), util::an_hour_ago(), Vec::new()),
        util::ca_from_key(util::p521_key(), util::an_hour_ago(), Vec::new()),
    ];
    for ca in cas {
        let (cert, _key) = ca.new_cert_and_key().unwrap();
        assert!(openssl_verifies(&ca.cert, &cert), "{:?}", ca.key);
    }
}

#[test]
fn test_openssl_verifies_chain_with_custom_subject_key_id() {
    let ski = SubjectKeyIdentifier {
        key_identifier: vec![1, 2, 3, 4, 5, 6, 7, 8],
    };
    let ca = util::ca_from_key(
        KeyPair::generate(KeyAlgorithm::Ecdsa).unwrap(),
        util::an_hour_ago(),
        vec![ExtensionParam::from_extension(ski, false).unwrap()],
    );
    let (cert, _key) = ca.new_cert_and_key().unwrap();
    assert!(openssl_verifies(&ca.cert, &cert));
}

#[test]
fn test_openssl_reads_private_keys() {
    for algorithm in [KeyAlgorithm::Rsa, KeyAlgorithm::Ecdsa] {
        let key = KeyPair::generate(algorithm).unwrap();
        let pem = codec::encode_private_key_pem(&key).unwrap();

        let pkey = PKey::private_key_from_pem(&pem).expect("openssl rejected private key");
        let expected = key.public_key().to_spki().unwrap().to_der().unwrap();
        assert_eq!(pkey.public_key_to_der().unwrap(), expected);
    }
}

#[test]
fn test_openssl_generated_keys_are_accepted() {
    let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
    let rsa_pem = rsa.private_key_to_pem().unwrap();
    let key = codec::parse_private_key(&rsa_pem).unwrap();
    assert!(matches!(key, KeyPair::Rsa { .. }));

    let group = openssl::ec::EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let ec = openssl::ec::EcKey::generate(&group).unwrap();
    let ec_pem = ec.private_key_to_pem().unwrap();
    let key = codec::parse_private_key(&ec_pem).unwrap();
    assert!(matches!(key, KeyPair::EcdsaP256 { .. }));

    let pkcs8_pem = PKey::from_ec_key(ec)
        .unwrap()
        .private_key_to_pem_pkcs8()
        .unwrap();
    let key = codec::parse_private_key(&pkcs8_pem).unwrap();
    assert!(matches!(key, KeyPair::EcdsaP256 { .. }));

    let group = openssl::ec::EcGroup::from_curve_name(Nid::SECP521R1).unwrap();
    let ec = openssl::ec::EcKey::generate(&group).unwrap();
    let key = codec::parse_private_key(&ec.private_key_to_pem().unwrap()).unwrap();
    assert!(matches!(key, KeyPair::EcdsaP521 { .. }));
    let pkcs8_pem = PKey::from_ec_key(ec)
        .unwrap()
        .private_key_to_pem_pkcs8()
        .unwrap();
    let pkcs8_key = codec::parse_private_key(&pkcs8_pem).unwrap();
    assert_eq!(pkcs8_key.public_key(), key.public_key());

    let ed = PKey::generate_ed25519().unwrap();
    let ed_pem = ed.private_key_to_pem_pkcs8().unwrap();
    let err = codec::parse_private_key(&ed_pem).unwrap_err();
    assert!(
        matches!(err, chaosd_pki::error::PkiError::UnsupportedKey(_)),
        "{err}"
    );
}
