//! Certificate signing requests (PKCS#10).
//!
//! [`build_csr`] turns a subject, a set of [`CsrParameters`] and a host list
//! into a signed request. Hosts are sorted into SAN kinds by
//! [`SubjectAltNames::classify`]; the requested extensions travel in the
//! `extensionRequest` attribute.

use std::net::IpAddr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, BitString, SetOfVec};
use der::{Decode, Encode};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::extensions::{
    BasicConstraints, CertificateTemplateName, ExtendedKeyUsage, ExtensionCodec, KeyUsage,
};
use crate::cert::params::{CsrParameters, DistinguishedName, ExtensionRecord};
use crate::cert::san::SubjectAltNames;
use crate::error::CertIssueError;
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::{CERTIFICATE_REQUEST_BLOCK_TYPE, der_to_pem};

pub type Result<T> = std::result::Result<T, CertIssueError>;

/// PKCS#9 `extensionRequest` attribute.
const EXTENSION_REQUEST_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// A parsed, signed certificate request.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub subject: DistinguishedName,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
    pub email_addresses: Vec<String>,
    /// Every requested extension, SAN included, in request order.
    pub extensions: Vec<ExtensionRecord>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub inner: CertReq,
    raw: Vec<u8>,
}

/// Builds and signs a certificate request.
///
/// The request carries, in order: the SAN extension (when `hosts` is not
/// empty), critical basic constraints, critical key usage, extended key usage
/// (only if at least one purpose has an OID) and the certificate template name
/// (when set). A subject without a common name takes the first host as one.
///
/// # Errors
/// Returns [`CertIssueError::RequestCreationError`] naming the stage that failed.
pub fn build_csr<S: AsRef<str>>(
    subject: &DistinguishedName,
    params: &CsrParameters,
    key: &KeyPair,
    hosts: &[S],
) -> Result<CertificateRequest> {
    let mut subject = subject.clone();
    if subject.common_name.as_deref().is_none_or(str::is_empty) {
        if let Some(first) = hosts.first() {
            subject.common_name = Some(first.as_ref().to_string());
        }
    }
    let name = subject
        .as_x509_name()
        .map_err(|e| CertIssueError::request("subject", e))?;

    let mut records = Vec::new();

    let mut alt_names = SubjectAltNames::classify(hosts);
    if !alt_names.is_empty() {
        alt_names.critical = name.0.is_empty();
        records.push(
            alt_names
                .marshal()
                .map_err(|e| CertIssueError::request("subject alt names", e))?,
        );
    }

    let basic_constraints = BasicConstraints {
        critical: true,
        is_ca: params.is_ca,
        max_path_len: params.max_path_len,
    };
    records.push(
        basic_constraints
            .marshal()
            .map_err(|e| CertIssueError::request("basic constraints", e))?,
    );

    let key_usage = KeyUsage {
        critical: true,
        usages: params.key_usage,
    };
    records.push(
        key_usage
            .marshal()
            .map_err(|e| CertIssueError::request("key usage", e))?,
    );

    let (ext_key_usage, dropped) = ExtendedKeyUsage::from_usages(&params.ext_key_usage, false);
    if !dropped.is_empty() {
        tracing::debug!(dropped = dropped.len(), "extended key usages without an OID left out");
    }
    if !ext_key_usage.oids.is_empty() {
        records.push(
            ext_key_usage
                .marshal()
                .map_err(|e| CertIssueError::request("extended key usage", e))?,
        );
    }

    if let Some(template) = &params.certificate_template {
        let template = CertificateTemplateName {
            name: template.clone(),
        };
        records.push(
            template
                .marshal()
                .map_err(|e| CertIssueError::request("certificate template", e))?,
        );
    }

    let extensions = records
        .iter()
        .map(ExtensionRecord::to_x509_extension)
        .collect::<std::result::Result<Vec<Extension>, _>>()
        .map_err(|e| CertIssueError::request("extensions", e))?;
    let attribute = extension_request_attribute(&extensions)
        .map_err(|e| CertIssueError::request("extension request", e))?;
    let attributes =
        SetOfVec::try_from(vec![attribute]).map_err(|e| CertIssueError::request("attributes", e))?;

    let public_key = key
        .public_key()
        .to_spki()
        .map_err(|e| CertIssueError::request("public key", e))?;

    let info = CertReqInfo {
        version: Version::V1,
        subject: name,
        public_key,
        attributes,
    };
    let info_der = info
        .to_der()
        .map_err(|e| CertIssueError::request("request info", e))?;
    let signature = key
        .sign(&info_der)
        .map_err(|e| CertIssueError::request("signature", e))?;
    let csr = CertReq {
        info,
        algorithm: key.signature_algorithm(),
        signature: BitString::from_bytes(&signature)
            .map_err(|e| CertIssueError::request("signature", e))?,
    };
    let der = csr
        .to_der()
        .map_err(|e| CertIssueError::request("encoding", e))?;

    let request =
        CertificateRequest::from_der(&der).map_err(|e| CertIssueError::request("parse", e))?;
    tracing::debug!(
        subject = ?request.subject.common_name,
        names = alt_names.len(),
        extensions = request.extensions.len(),
        "built certificate request"
    );
    Ok(request)
}

fn extension_request_attribute(extensions: &[Extension]) -> Result<Attribute> {
    let value = Any::encode_from(&extensions.to_vec())?;
    let values = SetOfVec::try_from(vec![value])?;
    Ok(Attribute {
        oid: EXTENSION_REQUEST_OID,
        values,
    })
}

impl CertificateRequest {
    /// Parses a DER-encoded request, collecting the requested extensions and SANs.
    ///
    /// The signature is not checked here; see [`CertificateRequest::verify`].
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parse_error = |e: der::Error| CertIssueError::ParseError(format!("certificate request: {e}"));
        let inner = CertReq::from_der(der).map_err(parse_error)?;

        let mut extensions = Vec::new();
        for attribute in inner.info.attributes.iter() {
            if attribute.oid != EXTENSION_REQUEST_OID {
                continue;
            }
            for value in attribute.values.iter() {
                let encoded = value.to_der().map_err(parse_error)?;
                let requested = Vec::<Extension>::from_der(&encoded).map_err(parse_error)?;
                extensions.extend(requested.iter().map(ExtensionRecord::from));
            }
        }

        let alt_names = match extensions
            .iter()
            .find(|record| record.oid == SubjectAltNames::OID)
        {
            Some(record) => SubjectAltNames::unmarshal(record).map_err(|e| {
                CertIssueError::ParseError(format!("certificate request subject alt names: {e}"))
            })?,
            None => SubjectAltNames::default(),
        };

        Ok(Self {
            subject: DistinguishedName::from_x509_name(&inner.info.subject),
            subject_public_key_info: inner.info.public_key.clone(),
            dns_names: alt_names.dns_names,
            ip_addresses: alt_names.ip_addresses,
            uris: alt_names.uris,
            email_addresses: alt_names.email_addresses,
            extensions,
            signature_algorithm: inner.algorithm.clone(),
            inner,
            raw: der.to_vec(),
        })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str)?;
        if block.tag() != CERTIFICATE_REQUEST_BLOCK_TYPE {
            return Err(CertIssueError::ParseError(format!(
                "expected {CERTIFICATE_REQUEST_BLOCK_TYPE} block, found {}",
                block.tag()
            )));
        }
        Self::from_der(block.contents())
    }

    pub fn to_der(&self) -> Vec<u8> {
        self.raw.clone()
    }

    pub fn to_pem(&self) -> String {
        der_to_pem(&self.raw, CERTIFICATE_REQUEST_BLOCK_TYPE)
    }

    /// The requested public key, or `None` for algorithms this crate does not handle.
    pub fn public_key(&self) -> Option<PublicKey> {
        PublicKey::from_spki(&self.subject_public_key_info)
    }

    /// Checks the request's self-signature.
    pub fn verify(&self) -> Result<()> {
        let public_key = self.public_key().ok_or_else(|| {
            CertIssueError::DecodingError(format!(
                "unsupported public key algorithm {}",
                self.subject_public_key_info.algorithm.oid
            ))
        })?;
        let info = self
            .inner
            .info
            .to_der()
            .map_err(|e| CertIssueError::EncodingError(e.to_string()))?;
        public_key.verify(
            &self.inner.algorithm,
            &info,
            self.inner.signature.raw_bytes(),
        )
    }

    pub fn subject_alt_names(&self) -> SubjectAltNames {
        SubjectAltNames {
            critical: false,
            dns_names: self.dns_names.clone(),
            ip_addresses: self.ip_addresses.clone(),
            uris: self.uris.clone(),
            email_addresses: self.email_addresses.clone(),
        }
    }

    pub fn find_extension<E: ExtensionCodec>(&self) -> Option<Result<E>> {
        self.extensions
            .iter()
            .find(|record| record.oid == E::OID)
            .map(E::unmarshal)
    }
}
