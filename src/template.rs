//! Turning a certificate request into a certificate template.
//!
//! Everything describing the subject comes from the request. The serial
//! number and validity window come from the signing authority.

use const_oid::ObjectIdentifier;
use time::OffsetDateTime;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::extensions::{BasicConstraints, ExtendedKeyUsage, ExtensionCodec, KeyUsage};
use crate::cert::params::{DistinguishedName, ExtensionRecord, SigningParameters};
use crate::cert::san::SubjectAltNames;
use crate::key::PublicKey;
use crate::request::CertificateRequest;
use crate::usage::ExtKeyUsage;

/// Contents of a certificate prior to signing.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    pub serial_number: u64,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// Subject name, carried over from the request unchanged.
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    /// Signature algorithm named by the request. The signer always uses the
    /// algorithm of its own key.
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub public_key_algorithm: ObjectIdentifier,
    pub subject_alt_names: SubjectAltNames,
    pub basic_constraints: Option<BasicConstraints>,
    pub key_usage: Option<KeyUsage>,
    pub ext_key_usage: Vec<ExtKeyUsage>,
    /// Requested extensions with no typed field, copied as-is.
    pub extra_extensions: Vec<ExtensionRecord>,
}

impl CertificateTemplate {
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.is_ca)
    }

    pub fn subject_name(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.subject)
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        PublicKey::from_spki(&self.subject_public_key_info)
    }
}

/// Derives a certificate template from a request.
///
/// Basic constraints, key usage and extended key usage are decoded leniently:
/// a malformed value leaves the corresponding field unset. Extensions of any
/// other kind are carried into [`CertificateTemplate::extra_extensions`], as is
/// a SAN extension holding names that [`SubjectAltNames`] has no slot for.
pub fn derive_template(csr: &CertificateRequest, params: &SigningParameters) -> CertificateTemplate {
    let mut template = CertificateTemplate {
        serial_number: params.serial_number,
        not_before: params.not_before,
        not_after: params.not_after,
        subject: csr.inner.info.subject.clone(),
        subject_public_key_info: csr.subject_public_key_info.clone(),
        signature_algorithm: csr.signature_algorithm.clone(),
        public_key_algorithm: csr.subject_public_key_info.algorithm.oid,
        subject_alt_names: csr.subject_alt_names(),
        basic_constraints: None,
        key_usage: None,
        ext_key_usage: Vec::new(),
        extra_extensions: Vec::new(),
    };

    for record in &csr.extensions {
        match record.oid {
            BasicConstraints::OID => match BasicConstraints::unmarshal(record) {
                Ok(bc) => template.basic_constraints = Some(bc),
                Err(e) => tracing::trace!(error = %e, "ignoring malformed basic constraints"),
            },
            KeyUsage::OID => match KeyUsage::unmarshal(record) {
                Ok(ku) => template.key_usage = Some(ku),
                Err(e) => tracing::trace!(error = %e, "ignoring malformed key usage"),
            },
            ExtendedKeyUsage::OID => match ExtendedKeyUsage::unmarshal(record) {
                Ok(eku) => template.ext_key_usage = eku.usages(),
                Err(e) => tracing::trace!(error = %e, "ignoring malformed extended key usage"),
            },
            SubjectAltNames::OID => match SubjectAltNames::uncarried_count(&record.value) {
                Ok(0) => {}
                Ok(uncarried) => {
                    tracing::trace!(uncarried, "keeping subject alt names verbatim");
                    template.extra_extensions.push(record.clone());
                }
                Err(e) => tracing::trace!(error = %e, "ignoring malformed subject alt names"),
            },
            _ => template.extra_extensions.push(record.clone()),
        }
    }

    tracing::debug!(
        serial = params.serial_number,
        is_ca = template.is_ca(),
        extra = template.extra_extensions.len(),
        "derived certificate template"
    );
    template
}
