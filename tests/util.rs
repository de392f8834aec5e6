#![allow(dead_code)]

use certissue::cert::Certificate;
use certissue::cert::params::{CsrParameters, DistinguishedName, SigningParameters};
use certissue::key::{KeyPair, KeyType};
use certissue::request::build_csr;
use certissue::signer::sign_request;
use certissue::validity;
use x509_cert::ext::pkix::KeyUsages;

pub struct Authority {
    pub cert: Certificate,
    pub key: KeyPair,
}

/// A self-signed root CA named `myca.local`.
pub fn generate_ca_cert(key_type: KeyType) -> Authority {
    generate_ca_cert_with_duration(key_type, time::Duration::ZERO)
}

pub fn generate_ca_cert_with_duration(key_type: KeyType, duration: time::Duration) -> Authority {
    let key = KeyPair::generate(key_type).unwrap();

    let subject = DistinguishedName::builder()
        .common_name("myca.local".to_string())
        .organization("My CA".to_string())
        .country("US".to_string())
        .build();

    let params = CsrParameters::builder()
        .is_ca(true)
        .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
        .build();
    let csr = build_csr::<&str>(&subject, &params, &key, &[]).unwrap();

    let signing = SigningParameters::builder()
        .serial_number(1)
        .not_after(validity::ca_not_after(duration, &[]))
        .build();

    Authority {
        cert: sign_request(&csr, None, &key, &signing).unwrap(),
        key,
    }
}

/// Signing parameters for a leaf under `authority`, clamped to its expiry.
pub fn leaf_signing(authority: &Authority, serial: u64) -> SigningParameters {
    SigningParameters::builder()
        .serial_number(serial)
        .not_after(validity::not_after(time::Duration::ZERO, &[&authority.cert]))
        .build()
}
