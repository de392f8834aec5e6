pub mod extensions;
pub mod params;
pub mod san;

use der::{Decode, Encode, EncodePem};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::CertIssueError;
use crate::key::PublicKey;
use crate::validity::from_x509_time;
use extensions::ExtensionCodec;
use params::{DistinguishedName, ExtensionRecord};
use san::SubjectAltNames;

pub type Result<T> = std::result::Result<T, CertIssueError>;

/// A parsed X.509 certificate together with the DER it was parsed from.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
    raw: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Certificate {}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| CertIssueError::ParseError(format!("certificate: {e}")))?;
        Ok(Self {
            inner,
            raw: der.to_vec(),
        })
    }

    /// Imports the first `CERTIFICATE` block of a PEM string.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        crate::pem_utils::load_certificates_from_pem(pem_str)?
            .into_iter()
            .next()
            .ok_or_else(|| CertIssueError::ParseError("no certificate block found".to_string()))
    }

    /// The exact DER encoding of the certificate.
    pub fn to_der(&self) -> Vec<u8> {
        self.raw.clone()
    }

    pub fn as_der(&self) -> &[u8] {
        &self.raw
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertIssueError::EncodingError(e.to_string()))
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// Big-endian serial number bytes, without leading zeros.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn not_before(&self) -> OffsetDateTime {
        from_x509_time(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> OffsetDateTime {
        from_x509_time(&self.inner.tbs_certificate.validity.not_after)
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The subject public key, or `None` for algorithms this crate does not handle.
    pub fn public_key(&self) -> Option<PublicKey> {
        PublicKey::from_spki(self.subject_public_key_info())
    }

    pub fn extensions(&self) -> Vec<ExtensionRecord> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ExtensionRecord::from)
            .collect()
    }

    /// Finds the extension `E` and decodes it.
    ///
    /// Returns `None` when the certificate has no such extension, and
    /// `Some(Err(_))` when it has one that does not decode.
    pub fn find_extension<E: ExtensionCodec>(&self) -> Option<Result<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::unmarshal(&ExtensionRecord::from(ext)))
    }

    pub fn subject_alt_names(&self) -> Result<SubjectAltNames> {
        self.find_extension::<SubjectAltNames>()
            .unwrap_or_else(|| Ok(SubjectAltNames::default()))
    }

    pub fn is_ca(&self) -> bool {
        matches!(
            self.find_extension::<extensions::BasicConstraints>(),
            Some(Ok(bc)) if bc.is_ca
        )
    }

    /// True when the issuer and subject names are byte-for-byte equal.
    pub fn is_self_issued(&self) -> bool {
        let tbs = &self.inner.tbs_certificate;
        tbs.issuer == tbs.subject
    }

    /// Checks the certificate signature against `issuer_key`.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<()> {
        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertIssueError::EncodingError(e.to_string()))?;
        issuer_key.verify(
            &self.inner.signature_algorithm,
            &tbs,
            self.inner.signature.raw_bytes(),
        )
    }
}
