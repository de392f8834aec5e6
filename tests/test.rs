mod util;

use std::net::IpAddr;

use certissue::cert::extensions::{
    BasicConstraints, CertificateTemplateName, ExtendedKeyUsage, KeyUsage,
};
use certissue::cert::params::{CsrParameters, DistinguishedName, SigningParameters};
use certissue::error::CertIssueError;
use certissue::key::{KeyPair, KeyType};
use certissue::pem_utils::{
    common_name_to_file_name, encode_certificates, encode_requests, load_certificates_from_pem,
};
use certissue::request::{CertificateRequest, build_csr};
use certissue::signer::{sign, sign_request};
use certissue::template::derive_template;
use certissue::tls::request_tls_certificate;
use certissue::usage::{ExtKeyUsage, parse_ext_key_usage, parse_key_usages};
use certissue::validity;
use der::flagset::FlagSet;
use time::OffsetDateTime;
use x509_cert::ext::pkix::KeyUsages;

pub type Result<T> = std::result::Result<T, CertIssueError>;

/// A server certificate for a DNS name, an email address and an IP address.
#[test]
fn issue_server_cert_with_dns_and_ip() -> Result<()> {
    let ca = util::generate_ca_cert(KeyType::EcP256);

    let key = KeyPair::generate(KeyType::EcP256)?;
    let params = CsrParameters::builder()
        .key_usage(KeyUsages::DigitalSignature.into())
        .ext_key_usage(vec![ExtKeyUsage::ServerAuth])
        .build();
    let csr = build_csr(
        &DistinguishedName::default(),
        &params,
        &key,
        &["example.com", "admin@example.com", "10.0.0.5"],
    )?;
    assert_eq!(csr.subject.common_name.as_deref(), Some("example.com"));
    assert_eq!(csr.dns_names, vec!["example.com"]);
    assert_eq!(csr.email_addresses, vec!["admin@example.com"]);
    assert_eq!(csr.ip_addresses, vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);

    let cert = sign_request(&csr, Some(&ca.cert), &ca.key, &util::leaf_signing(&ca, 2))?;
    let names = cert.subject_alt_names()?;
    assert_eq!(names.dns_names, vec!["example.com"]);
    assert_eq!(names.email_addresses, vec!["admin@example.com"]);
    assert_eq!(names.ip_addresses, vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);
    assert_eq!(cert.subject().common_name.as_deref(), Some("example.com"));
    assert_eq!(cert.issuer(), ca.cert.subject());

    let bc = cert.find_extension::<BasicConstraints>().unwrap()?;
    assert!(bc.critical && !bc.is_ca);
    let ku = cert.find_extension::<KeyUsage>().unwrap()?;
    assert!(ku.critical);
    assert_eq!(ku.usages, FlagSet::from(KeyUsages::DigitalSignature));
    let eku = cert.find_extension::<ExtendedKeyUsage>().unwrap()?;
    assert!(!eku.critical);
    assert_eq!(eku.usages(), vec![ExtKeyUsage::ServerAuth]);

    cert.verify_signature(&ca.key.public_key())?;
    Ok(())
}

/// A purpose with no registry mapping is left out, the rest survive.
#[test]
fn unknown_purpose_is_dropped() -> Result<()> {
    let ca = util::generate_ca_cert(KeyType::EcP256);
    let key = KeyPair::generate(KeyType::EcP256)?;
    let purposes = vec![ExtKeyUsage::ServerAuth, ExtKeyUsage::from_name("Bogus")];
    assert_eq!(purposes[1], ExtKeyUsage::Unknown("Bogus".to_string()));
    assert!(parse_ext_key_usage("Bogus").is_err());

    let params = CsrParameters::builder().ext_key_usage(purposes).build();
    let csr = build_csr(&DistinguishedName::default(), &params, &key, &["a.example"])?;
    let cert = sign_request(&csr, Some(&ca.cert), &ca.key, &util::leaf_signing(&ca, 3))?;

    let eku = cert.find_extension::<ExtendedKeyUsage>().unwrap()?;
    assert_eq!(eku.oids.len(), 1);
    assert_eq!(eku.usages(), vec![ExtKeyUsage::ServerAuth]);
    Ok(())
}

/// A leaf asking for the default lifetime under a short-lived CA ends with the CA.
#[test]
fn validity_is_clamped_to_authority() -> Result<()> {
    let ca = util::generate_ca_cert_with_duration(KeyType::EcP256, time::Duration::days(30));
    let ca_end = ca.cert.not_after();
    assert!(ca_end < OffsetDateTime::now_utc() + time::Duration::days(31));

    let end = validity::not_after(time::Duration::ZERO, &[&ca.cert]);
    assert_eq!(end, ca_end);

    let key = KeyPair::generate(KeyType::EcP256)?;
    let csr = build_csr(
        &DistinguishedName::default(),
        &CsrParameters::default(),
        &key,
        &["short.example"],
    )?;
    let cert = sign_request(&csr, Some(&ca.cert), &ca.key, &util::leaf_signing(&ca, 4))?;
    assert!(cert.not_after() <= ca_end);
    assert!(cert.not_before() < OffsetDateTime::now_utc() - time::Duration::hours(1));

    // Parameters that ignore the policy are still held to the authority.
    let greedy = SigningParameters::builder()
        .serial_number(5)
        .not_after(OffsetDateTime::now_utc() + time::Duration::days(3650))
        .build();
    let cert = sign_request(&csr, Some(&ca.cert), &ca.key, &greedy)?;
    assert_eq!(cert.not_after(), ca_end);
    Ok(())
}

/// Self-signing: issuer equals subject and the certificate verifies under its own key.
#[test]
fn self_signed_certificate_verifies() -> Result<()> {
    for key_type in [KeyType::Rsa2048, KeyType::EcP384, KeyType::EcP521] {
        let ca = util::generate_ca_cert(key_type);
        assert!(ca.cert.is_self_issued());
        assert!(ca.cert.is_ca());
        assert_eq!(ca.cert.subject(), ca.cert.issuer());
        assert_eq!(ca.cert.public_key(), Some(ca.key.public_key()));
        ca.cert.verify_signature(&ca.key.public_key())?;
        assert_eq!(
            ca.cert.inner.signature_algorithm.oid,
            ca.key.signature_algorithm().oid
        );
    }
    Ok(())
}

/// Root, intermediate and leaf: key identifiers chain up and lifetimes nest.
#[test]
fn intermediate_chain() -> Result<()> {
    let root = util::generate_ca_cert(KeyType::EcP384);

    let intermediate_key = KeyPair::generate(KeyType::EcP256)?;
    let intermediate_subject = DistinguishedName::builder()
        .common_name("intermediate.myca.local".to_string())
        .build();
    let intermediate_params = CsrParameters::builder()
        .is_ca(true)
        .max_path_len(0)
        .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
        .build();
    let csr = build_csr::<&str>(
        &intermediate_subject,
        &intermediate_params,
        &intermediate_key,
        &[],
    )?;
    let signing = SigningParameters::builder()
        .serial_number(10)
        .not_after(validity::ca_not_after(time::Duration::ZERO, &[&root.cert]))
        .build();
    let intermediate = sign_request(&csr, Some(&root.cert), &root.key, &signing)?;
    assert!(intermediate.is_ca());
    assert!(!intermediate.is_self_issued());
    assert!(intermediate.not_after() <= root.cert.not_after());
    intermediate.verify_signature(&root.key.public_key())?;

    let bc = intermediate.find_extension::<BasicConstraints>().unwrap()?;
    assert_eq!(bc.max_path_len, Some(0));

    let leaf = request_tls_certificate(
        &intermediate,
        &intermediate_key,
        &SigningParameters::builder()
            .serial_number(11)
            .not_after(validity::not_after(
                time::Duration::days(90),
                &[&intermediate, &root.cert],
            ))
            .build(),
        KeyType::Rsa2048,
        &["leaf.myca.local"],
    )?;
    leaf.leaf.verify_signature(&intermediate_key.public_key())?;
    assert_eq!(leaf.chain.len(), 2);
    assert_eq!(leaf.chain[1], intermediate);

    let ski = |cert: &certissue::cert::Certificate| {
        cert.extensions()
            .into_iter()
            .find(|ext| ext.oid.to_string() == "2.5.29.14")
            .map(|ext| ext.value)
    };
    let aki = |cert: &certissue::cert::Certificate| {
        cert.extensions()
            .into_iter()
            .find(|ext| ext.oid.to_string() == "2.5.29.35")
            .map(|ext| ext.value)
    };
    // The SKI value is an OCTET STRING; the AKI wraps the same bytes as [0].
    let intermediate_ski = ski(&intermediate).unwrap();
    let leaf_aki = aki(&leaf.leaf).unwrap();
    assert!(leaf_aki.ends_with(&intermediate_ski[2..]));
    assert!(ski(&leaf.leaf).is_none());
    Ok(())
}

/// Extensions the template has no field for still reach the certificate.
#[test]
fn certificate_template_name_is_carried() -> Result<()> {
    let ca = util::generate_ca_cert(KeyType::EcP256);
    let key = KeyPair::generate(KeyType::EcP256)?;
    let params = CsrParameters::builder()
        .key_usage(parse_key_usages(&["DigitalSignature", "KeyEncipherment"])?)
        .ext_key_usage(vec![ExtKeyUsage::ClientAuth])
        .certificate_template("User".to_string())
        .build();
    let csr = build_csr(
        &DistinguishedName::default(),
        &params,
        &key,
        &["user@example.com"],
    )?;
    assert_eq!(csr.email_addresses, vec!["user@example.com"]);

    let template = derive_template(&csr, &util::leaf_signing(&ca, 20));
    assert_eq!(template.extra_extensions.len(), 1);
    let cert = sign(&template, Some(&ca.cert), &ca.key)?;

    let name = cert.find_extension::<CertificateTemplateName>().unwrap()?;
    assert_eq!(name.name, "User");
    assert_eq!(
        cert.subject_alt_names()?.email_addresses,
        vec!["user@example.com"]
    );
    Ok(())
}

#[test]
fn wrong_authority_key_is_rejected() -> Result<()> {
    let ca = util::generate_ca_cert(KeyType::EcP256);
    let impostor = KeyPair::generate(KeyType::EcP256)?;
    let key = KeyPair::generate(KeyType::EcP256)?;
    let csr = build_csr(
        &DistinguishedName::default(),
        &CsrParameters::default(),
        &key,
        &["x.example"],
    )?;
    let result = sign_request(&csr, Some(&ca.cert), &impostor, &util::leaf_signing(&ca, 30));
    assert!(matches!(
        result,
        Err(CertIssueError::SigningError {
            stage: "key check",
            ..
        })
    ));
    Ok(())
}

#[test]
fn pem_bundles_round_trip() -> Result<()> {
    let ca = util::generate_ca_cert(KeyType::EcP256);
    let tls = request_tls_certificate(
        &ca.cert,
        &ca.key,
        &util::leaf_signing(&ca, 40),
        KeyType::EcP256,
        &["*.example.com"],
    )?;

    let bundle = encode_certificates(&tls.chain);
    let loaded = load_certificates_from_pem(&bundle)?;
    assert_eq!(loaded, tls.chain);

    let cn = tls.leaf.subject().common_name.unwrap();
    assert_eq!(common_name_to_file_name(&cn), "STAR_example_com");

    let key = KeyPair::generate(KeyType::EcP256)?;
    let csr = build_csr(
        &DistinguishedName::default(),
        &CsrParameters::default(),
        &key,
        &["csr.example"],
    )?;
    let pem = encode_requests(std::slice::from_ref(&csr));
    let parsed = CertificateRequest::from_pem(&pem)?;
    assert_eq!(parsed.to_der(), csr.to_der());
    parsed.verify()?;
    Ok(())
}
