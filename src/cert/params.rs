use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, OctetString, PrintableStringRef, SetOfVec, Utf8StringRef};
use der::flagset::FlagSet;
use der::{Decode, Encode};
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::ext::pkix::name::DirectoryString;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::error::CertIssueError;
use crate::usage::ExtKeyUsage;

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Parameters for building a certificate signing request.
///
/// # Fields
/// * `key_usage` - Key usage bits, always emitted as a critical extension.
/// * `ext_key_usage` - Extended key usage purposes; purposes without an OID are dropped.
/// * `is_ca` - Whether the subject may issue certificates.
/// * `max_path_len` - Path length constraint for CA requests, `None` for unconstrained.
/// * `certificate_template` - Issuance profile name understood by some private CAs.
#[derive(Clone, Debug, Default, Builder)]
pub struct CsrParameters {
    #[builder(default)]
    pub key_usage: FlagSet<KeyUsages>,
    #[builder(default)]
    pub ext_key_usage: Vec<ExtKeyUsage>,
    #[builder(default)]
    pub is_ca: bool,
    pub max_path_len: Option<u8>,
    pub certificate_template: Option<String>,
}

/// Parameters chosen by the signing authority.
#[derive(Clone, Debug, Builder)]
pub struct SigningParameters {
    /// Serial number, unique per issuer.
    pub serial_number: u64,
    #[builder(default = crate::validity::not_before())]
    pub not_before: OffsetDateTime,
    #[builder(default = crate::validity::not_after(time::Duration::ZERO, &[]))]
    pub not_after: OffsetDateTime,
}

impl SigningParameters {
    /// A random positive 63-bit serial number.
    pub fn random_serial() -> u64 {
        rand::random::<u64>() >> 1
    }
}

/// Distinguished name of a certificate subject or issuer.
///
/// # Fields
/// * `common_name` - The common name (CN). May be unset; request building then
///   defaults it to the first host.
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name, skipping unset attributes.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name, CertIssueError> {
        let attributes = [
            (COUNTRY, &self.country),
            (ORGANIZATION, &self.organization),
            (ORGANIZATION_UNIT, &self.organization_unit),
            (LOCALITY, &self.locality),
            (STATE, &self.state),
            (COMMON_NAME, &self.common_name),
        ];

        let mut rdns = Vec::new();
        for (oid, value) in attributes {
            let Some(value) = value else { continue };
            let value = if oid == COUNTRY {
                PrintableStringRef::new(value).and_then(|s| Any::encode_from(&s))
            } else {
                Utf8StringRef::new(value).and_then(|s| Any::encode_from(&s))
            }
            .map_err(|e| CertIssueError::EncodingError(format!("name attribute {oid}: {e}")))?;
            let atv = AttributeTypeAndValue { oid, value };
            let rdn = SetOfVec::try_from(vec![atv])
                .map_err(|e| CertIssueError::EncodingError(e.to_string()))?;
            rdns.push(RelativeDistinguishedName(rdn));
        }
        Ok(RdnSequence(rdns))
    }

    /// Reads the supported attributes out of an X.509 name. Other attributes are ignored.
    pub fn from_x509_name(x509dn: &x509_cert::name::Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = decode_directory_string(&attr.value) else {
                    continue;
                };
                let slot = match attr.oid {
                    COMMON_NAME => &mut dn.common_name,
                    COUNTRY => &mut dn.country,
                    STATE => &mut dn.state,
                    LOCALITY => &mut dn.locality,
                    ORGANIZATION => &mut dn.organization,
                    ORGANIZATION_UNIT => &mut dn.organization_unit,
                    _ => continue,
                };
                *slot = Some(value);
            }
        }
        dn
    }
}

fn decode_directory_string(value: &Any) -> Option<String> {
    let der = value.to_der().ok()?;
    match DirectoryString::from_der(&der).ok()? {
        DirectoryString::PrintableString(s) => Some(s.to_string()),
        DirectoryString::TeletexString(s) => Some(s.to_string()),
        DirectoryString::Utf8String(s) => Some(s),
    }
}

/// A generic X.509 extension: object identifier, criticality and DER-encoded value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRecord {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionRecord {
    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension, CertIssueError> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }
}

impl From<&x509_cert::ext::Extension> for ExtensionRecord {
    fn from(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}
