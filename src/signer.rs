//! Signing certificate templates.
//!
//! [`sign`] turns a [`CertificateTemplate`] into a certificate. With an
//! authority certificate the result is issued by that authority; without one
//! it is self-signed and the template's own key must be the signing key.

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{BitString, OctetString};
use der::{Decode, Encode};
use sha1::{Digest, Sha1};
use x509_cert::certificate::CertificateInner;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::Certificate;
use crate::cert::extensions::{ExtendedKeyUsage, ExtensionCodec};
use crate::cert::san::SubjectAltNames;
use crate::cert::params::{ExtensionRecord, SigningParameters};
use crate::error::CertIssueError;
use crate::key::KeyPair;
use crate::request::CertificateRequest;
use crate::tbs_certificate::TbsCertificate;
use crate::template::{CertificateTemplate, derive_template};

pub type Result<T> = std::result::Result<T, CertIssueError>;

const SUBJECT_KEY_IDENTIFIER_OID: ObjectIdentifier =
    <x509_cert::ext::pkix::SubjectKeyIdentifier as AssociatedOid>::OID;
const AUTHORITY_KEY_IDENTIFIER_OID: ObjectIdentifier =
    <x509_cert::ext::pkix::AuthorityKeyIdentifier as AssociatedOid>::OID;

/// Signs `template`, producing a parsed certificate.
///
/// * `authority` - The issuing CA certificate, or `None` to self-sign.
/// * `authority_key` - The private key of the issuer. It must match the
///   authority certificate, or the template's public key when self-signing.
///
/// The signature algorithm is always the one belonging to `authority_key`, and
/// the certificate never outlives `authority`.
///
/// # Errors
/// Returns [`CertIssueError::SigningError`] naming the failing stage.
pub fn sign(
    template: &CertificateTemplate,
    authority: Option<&Certificate>,
    authority_key: &KeyPair,
) -> Result<Certificate> {
    let signing_public_key = authority_key.public_key();
    let (issuer, issuer_spki) = match authority {
        Some(authority) => {
            if authority.public_key().as_ref() != Some(&signing_public_key) {
                return Err(CertIssueError::signing(
                    "key check",
                    "private key does not match the authority certificate",
                ));
            }
            (
                authority.inner.tbs_certificate.subject.clone(),
                authority.subject_public_key_info().clone(),
            )
        }
        None => {
            if template.public_key().as_ref() != Some(&signing_public_key) {
                return Err(CertIssueError::signing(
                    "key check",
                    "private key does not match the self-signed template",
                ));
            }
            (
                template.subject.clone(),
                template.subject_public_key_info.clone(),
            )
        }
    };

    let signature_algorithm = authority_key.signature_algorithm();
    if signature_algorithm.oid != template.signature_algorithm.oid {
        tracing::debug!(
            requested = %template.signature_algorithm.oid,
            used = %signature_algorithm.oid,
            "signing with the authority key's algorithm"
        );
    }

    let not_after = match authority {
        Some(authority) if authority.not_after() < template.not_after => {
            tracing::debug!(
                requested = %template.not_after,
                limit = %authority.not_after(),
                "validity clamped to authority expiry"
            );
            authority.not_after()
        }
        _ => template.not_after,
    };

    let mut extensions = template_extensions(template)?;
    if template.is_ca() {
        let ski = key_identifier(&template.subject_public_key_info);
        extensions.push(key_identifier_record(SUBJECT_KEY_IDENTIFIER_OID, ski, |id| {
            x509_cert::ext::pkix::SubjectKeyIdentifier(id).to_der()
        })?);
    }
    let issued_by_other_key = issuer_spki != template.subject_public_key_info;
    if let Some(authority) = authority.filter(|_| issued_by_other_key) {
        let aki = authority_subject_key_id(authority)
            .unwrap_or_else(|| key_identifier(&issuer_spki));
        extensions.push(key_identifier_record(AUTHORITY_KEY_IDENTIFIER_OID, aki, |id| {
            x509_cert::ext::pkix::AuthorityKeyIdentifier {
                key_identifier: Some(id),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            }
            .to_der()
        })?);
    }
    for extra in &template.extra_extensions {
        if extensions.iter().any(|ext| ext.oid == extra.oid) {
            tracing::trace!(oid = %extra.oid, "extension already present, skipping copy");
            continue;
        }
        extensions.push(extra.clone());
    }

    let tbs = TbsCertificate {
        serial_number: template.serial_number,
        signature_algorithm: signature_algorithm.clone(),
        issuer,
        not_before: template.not_before,
        not_after,
        subject: template.subject.clone(),
        subject_public_key_info: template.subject_public_key_info.clone(),
        extensions,
    };
    let (tbs_certificate, tbs_der) = tbs.to_der()?;

    let signature = authority_key
        .sign(&tbs_der)
        .map_err(|e| CertIssueError::signing("signature", e))?;

    let inner = CertificateInner {
        tbs_certificate,
        signature_algorithm,
        signature: BitString::from_bytes(&signature)
            .map_err(|e| CertIssueError::signing("signature", e))?,
    };
    let der = inner
        .to_der()
        .map_err(|e| CertIssueError::signing("encoding", e))?;
    let certificate =
        Certificate::from_der(&der).map_err(|e| CertIssueError::signing("parse", e))?;

    tracing::debug!(
        serial = template.serial_number,
        self_signed = authority.is_none(),
        not_after = %certificate.not_after(),
        "signed certificate"
    );
    Ok(certificate)
}

/// Derives a template from `csr` and signs it in one step.
pub fn sign_request(
    csr: &CertificateRequest,
    authority: Option<&Certificate>,
    authority_key: &KeyPair,
    params: &SigningParameters,
) -> Result<Certificate> {
    let template = derive_template(csr, params);
    sign(&template, authority, authority_key)
}

/// Encodes the typed template fields in output order: SAN, basic constraints,
/// key usage, extended key usage.
///
/// A SAN record among the extra extensions takes the place of the typed SAN.
fn template_extensions(template: &CertificateTemplate) -> Result<Vec<ExtensionRecord>> {
    let failed = |stage: &'static str| move |e: CertIssueError| CertIssueError::signing(stage, e);
    let mut records = Vec::new();

    let raw_alt_names = template
        .extra_extensions
        .iter()
        .find(|ext| ext.oid == SubjectAltNames::OID);
    if let Some(raw) = raw_alt_names {
        records.push(raw.clone());
    } else if !template.subject_alt_names.is_empty() {
        let mut alt_names = template.subject_alt_names.clone();
        alt_names.critical = template.subject.0.is_empty();
        records.push(alt_names.marshal().map_err(failed("subject alt names"))?);
    }
    if let Some(bc) = &template.basic_constraints {
        records.push(bc.marshal().map_err(failed("basic constraints"))?);
    }
    if let Some(ku) = template.key_usage.filter(|ku| !ku.usages.is_empty()) {
        records.push(ku.marshal().map_err(failed("key usage"))?);
    }
    let (eku, _) = ExtendedKeyUsage::from_usages(&template.ext_key_usage, false);
    if !eku.oids.is_empty() {
        records.push(eku.marshal().map_err(failed("extended key usage"))?);
    }
    Ok(records)
}

/// SHA-1 over the subject public key bits (RFC 5280 section 4.2.1.2, method 1).
fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

fn authority_subject_key_id(authority: &Certificate) -> Option<Vec<u8>> {
    authority
        .inner
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == SUBJECT_KEY_IDENTIFIER_OID)
        .and_then(|ext| {
            x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok()
        })
        .map(|ski| ski.0.as_bytes().to_vec())
}

fn key_identifier_record(
    oid: ObjectIdentifier,
    id: Vec<u8>,
    encode: impl FnOnce(OctetString) -> der::Result<Vec<u8>>,
) -> Result<ExtensionRecord> {
    let id = OctetString::new(id).map_err(|e| CertIssueError::signing("key identifier", e))?;
    let value = encode(id).map_err(|e| CertIssueError::signing("key identifier", e))?;
    Ok(ExtensionRecord {
        oid,
        critical: false,
        value,
    })
}
