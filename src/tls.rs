//! One-call issuance of TLS certificates from an existing authority.

use x509_cert::ext::pkix::KeyUsages;

use crate::cert::Certificate;
use crate::cert::params::{CsrParameters, SigningParameters};
use crate::error::CertIssueError;
use crate::key::{KeyPair, KeyType};
use crate::pem_utils::encode_certificates;
use crate::request::build_csr;
use crate::signer::sign_request;
use crate::usage::ExtKeyUsage;

pub type Result<T> = std::result::Result<T, CertIssueError>;

/// A freshly issued certificate with its chain and private key.
#[derive(Debug, Clone)]
pub struct TlsCertificate {
    pub leaf: Certificate,
    /// `[leaf, authority]`, leaf first.
    pub chain: Vec<Certificate>,
    pub key: KeyPair,
}

impl TlsCertificate {
    /// The chain as concatenated PEM blocks, leaf first.
    pub fn chain_pem(&self) -> String {
        encode_certificates(&self.chain)
    }

    pub fn key_pem(&self) -> Result<String> {
        self.key.to_pem()
    }
}

/// Issues a server certificate for `hosts` under `authority`.
///
/// The certificate has the DigitalSignature key usage and the ServerAuth
/// purpose. See [`request_tls_certificate_with_usages`].
pub fn request_tls_certificate<S: AsRef<str>>(
    authority: &Certificate,
    authority_key: &KeyPair,
    params: &SigningParameters,
    key_type: KeyType,
    hosts: &[S],
) -> Result<TlsCertificate> {
    let usages = CsrParameters::builder()
        .key_usage(KeyUsages::DigitalSignature.into())
        .ext_key_usage(vec![ExtKeyUsage::ServerAuth])
        .build();
    request_tls_certificate_with_usages(authority, authority_key, params, key_type, &usages, hosts)
}

/// Generates a key, requests a certificate for `hosts` and signs it with the authority.
///
/// The subject copies the authority's subject, with the common name replaced
/// by the first host.
///
/// # Errors
/// [`CertIssueError::InvalidInput`] when `hosts` is empty, otherwise whatever
/// key generation, request building or signing reports.
pub fn request_tls_certificate_with_usages<S: AsRef<str>>(
    authority: &Certificate,
    authority_key: &KeyPair,
    params: &SigningParameters,
    key_type: KeyType,
    usages: &CsrParameters,
    hosts: &[S],
) -> Result<TlsCertificate> {
    let Some(first) = hosts.first() else {
        return Err(CertIssueError::InvalidInput(
            "at least one host is required".to_string(),
        ));
    };

    let mut subject = authority.subject();
    subject.common_name = Some(first.as_ref().to_string());

    let key = KeyPair::generate(key_type)?;
    let csr = build_csr(&subject, usages, &key, hosts)?;
    let leaf = sign_request(&csr, Some(authority), authority_key, params)?;
    tracing::debug!(host = first.as_ref(), %key_type, "issued TLS certificate");

    Ok(TlsCertificate {
        chain: vec![leaf.clone(), authority.clone()],
        leaf,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;

    fn authority() -> (Certificate, KeyPair) {
        let key = KeyPair::generate(KeyType::EcP256).unwrap();
        let subject = DistinguishedName::builder()
            .common_name("TLS Test CA".to_string())
            .organization("Acme".to_string())
            .country("DE".to_string())
            .build();
        let params = CsrParameters::builder()
            .is_ca(true)
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .build();
        let csr = build_csr::<&str>(&subject, &params, &key, &[]).unwrap();
        let signing = SigningParameters::builder().serial_number(1).build();
        (sign_request(&csr, None, &key, &signing).unwrap(), key)
    }

    #[test]
    fn test_request_tls_certificate() {
        let (ca, ca_key) = authority();
        let signing = SigningParameters::builder().serial_number(7).build();
        let tls = request_tls_certificate(
            &ca,
            &ca_key,
            &signing,
            KeyType::EcP256,
            &["api.acme.test", "127.0.0.1"],
        )
        .unwrap();

        let subject = tls.leaf.subject();
        assert_eq!(subject.common_name.as_deref(), Some("api.acme.test"));
        assert_eq!(subject.organization.as_deref(), Some("Acme"));
        assert_eq!(subject.country.as_deref(), Some("DE"));
        assert_eq!(tls.chain, vec![tls.leaf.clone(), ca.clone()]);
        assert_eq!(tls.leaf.public_key(), Some(tls.key.public_key()));
        assert!(tls.chain_pem().matches("BEGIN CERTIFICATE").count() == 2);
        assert!(tls.key_pem().unwrap().contains("EC PRIVATE KEY"));
    }

    #[test]
    fn test_empty_hosts_is_invalid_input() {
        let (ca, ca_key) = authority();
        let signing = SigningParameters::builder().serial_number(8).build();
        let result = request_tls_certificate::<&str>(&ca, &ca_key, &signing, KeyType::EcP256, &[]);
        assert!(matches!(result, Err(CertIssueError::InvalidInput(_))));
    }
}
