use const_oid::{AssociatedOid, ObjectIdentifier};
use der::flagset::FlagSet;
use der::{Decode, Encode, Reader, SliceReader};
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::ext::pkix::name::DirectoryString;

use super::params::ExtensionRecord;
use crate::error::CertIssueError;
use crate::usage::{self, ExtKeyUsage};

/// OID of the vendor extension naming the certificate template a CA should apply.
pub const CERTIFICATE_TEMPLATE_NAME_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.20.2");

/// Typed view of one extension kind, convertible to and from an [`ExtensionRecord`].
///
/// Decoding is strict: a record with a different OID is rejected, and so is a
/// value with bytes left over after the known fields.
///
/// # Example
/// ```
/// use certissue::cert::extensions::{BasicConstraints, ExtensionCodec};
/// let bc = BasicConstraints { critical: true, is_ca: true, max_path_len: Some(1) };
/// let record = bc.marshal().unwrap();
/// assert_eq!(BasicConstraints::unmarshal(&record).unwrap(), bc);
/// ```
pub trait ExtensionCodec: Sized {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension value (the contents of `extnValue`).
    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError>;

    /// Decodes the extension value. `critical` is taken from the enclosing record.
    fn from_extension_value(value: &[u8], critical: bool) -> Result<Self, CertIssueError>;

    fn is_critical(&self) -> bool;

    fn marshal(&self) -> Result<ExtensionRecord, CertIssueError> {
        Ok(ExtensionRecord {
            oid: Self::OID,
            critical: self.is_critical(),
            value: self.to_extension_value()?,
        })
    }

    fn unmarshal(record: &ExtensionRecord) -> Result<Self, CertIssueError> {
        if record.oid != Self::OID {
            return Err(CertIssueError::UnexpectedOid {
                expected: Self::OID,
                found: record.oid,
            });
        }
        Self::from_extension_value(&record.value, record.critical)
    }
}

/// Decodes exactly one `T` from `bytes`, reporting leftover bytes as [`CertIssueError::TrailingBytes`].
pub(crate) fn decode_strict<'a, T: Decode<'a>>(bytes: &'a [u8]) -> Result<T, CertIssueError> {
    let mut reader = SliceReader::new(bytes)?;
    let value = T::decode(&mut reader)?;
    let remaining = usize::try_from(reader.remaining_len())?;
    if remaining > 0 {
        return Err(CertIssueError::TrailingBytes(remaining));
    }
    Ok(value)
}

fn encoding_error(kind: &str, err: der::Error) -> CertIssueError {
    CertIssueError::EncodingError(format!("{kind}: {err}"))
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `critical` - Criticality of the extension.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_len` - The maximum number of intermediate CAs allowed below this one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub critical: bool,
    pub is_ca: bool,
    pub max_path_len: Option<u8>,
}

impl ExtensionCodec for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError> {
        if !self.is_ca && self.max_path_len.is_some() {
            return Err(CertIssueError::EncodingError(
                "basic constraints: path length constraint requires a CA".to_string(),
            ));
        }
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_len,
        };
        bc.to_der().map_err(|e| encoding_error("basic constraints", e))
    }

    fn from_extension_value(value: &[u8], critical: bool) -> Result<Self, CertIssueError> {
        let bc: x509_cert::ext::pkix::BasicConstraints = decode_strict(value)?;
        Ok(Self {
            critical,
            is_ca: bc.ca,
            max_path_len: bc.path_len_constraint,
        })
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsage {
    pub critical: bool,
    pub usages: FlagSet<KeyUsages>,
}

impl ExtensionCodec for KeyUsage {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::KeyUsage as AssociatedOid>::OID;

    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError> {
        x509_cert::ext::pkix::KeyUsage(self.usages)
            .to_der()
            .map_err(|e| encoding_error("key usage", e))
    }

    fn from_extension_value(value: &[u8], critical: bool) -> Result<Self, CertIssueError> {
        let ku: x509_cert::ext::pkix::KeyUsage = decode_strict(value)?;
        Ok(Self {
            critical,
            usages: ku.0,
        })
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Represents the Extended Key Usage extension as a list of purpose OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub critical: bool,
    pub oids: Vec<ObjectIdentifier>,
}

impl ExtendedKeyUsage {
    /// Resolves purposes to OIDs, keeping input order.
    ///
    /// Purposes without a mapping are left out of the extension and returned as
    /// the second element so callers can see what was dropped.
    pub fn from_usages(usages: &[ExtKeyUsage], critical: bool) -> (Self, Vec<ExtKeyUsage>) {
        let mut oids = Vec::with_capacity(usages.len());
        let mut dropped = Vec::new();
        for usage in usages {
            match usage::ext_key_usage_to_oid(usage) {
                Some(oid) => oids.push(oid),
                None => {
                    tracing::trace!(%usage, "dropping extended key usage without an OID");
                    dropped.push(usage.clone());
                }
            }
        }
        (Self { critical, oids }, dropped)
    }

    /// Maps the OIDs back to purposes, skipping OIDs the registry does not know.
    pub fn usages(&self) -> Vec<ExtKeyUsage> {
        self.oids
            .iter()
            .filter_map(|oid| {
                let usage = usage::oid_to_ext_key_usage(oid);
                if usage.is_none() {
                    tracing::trace!(%oid, "skipping unrecognized extended key usage OID");
                }
                usage
            })
            .collect()
    }
}

impl ExtensionCodec for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError> {
        x509_cert::ext::pkix::ExtendedKeyUsage(self.oids.clone())
            .to_der()
            .map_err(|e| encoding_error("extended key usage", e))
    }

    fn from_extension_value(value: &[u8], critical: bool) -> Result<Self, CertIssueError> {
        let eku: x509_cert::ext::pkix::ExtendedKeyUsage = decode_strict(value)?;
        Ok(Self {
            critical,
            oids: eku.0,
        })
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}

/// The certificate template name extension (`1.3.6.1.4.1.311.20.2`).
///
/// The name is written as a PrintableString when it fits that alphabet and as a
/// UTF8String otherwise. The extension is never marked critical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateTemplateName {
    pub name: String,
}

impl ExtensionCodec for CertificateTemplateName {
    const OID: ObjectIdentifier = CERTIFICATE_TEMPLATE_NAME_OID;

    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError> {
        if self.name.is_empty() {
            return Err(CertIssueError::EncodingError(
                "no certificate template specified".to_string(),
            ));
        }
        let value = match der::asn1::PrintableString::new(&self.name) {
            Ok(printable) => DirectoryString::PrintableString(printable),
            Err(_) => DirectoryString::Utf8String(self.name.clone()),
        };
        value
            .to_der()
            .map_err(|e| encoding_error("certificate template name", e))
    }

    fn from_extension_value(value: &[u8], _critical: bool) -> Result<Self, CertIssueError> {
        let name = match decode_strict::<DirectoryString>(value)? {
            DirectoryString::PrintableString(s) => s.to_string(),
            DirectoryString::TeletexString(s) => s.to_string(),
            DirectoryString::Utf8String(s) => s,
        };
        Ok(Self { name })
    }

    fn is_critical(&self) -> bool {
        false
    }
}
