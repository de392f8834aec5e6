use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{Ia5String, OctetString};
use der::Encode;
use x509_cert::ext::pkix::name::GeneralName;

use super::extensions::{ExtensionCodec, decode_strict};
use crate::error::CertIssueError;

/// Subject Alternative Names split by kind.
///
/// Each list keeps the order in which its entries were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltNames {
    pub critical: bool,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
    pub email_addresses: Vec<String>,
}

impl SubjectAltNames {
    /// Sorts host identifiers into SAN slots.
    ///
    /// Precedence: anything containing `@` is an email address, then IP
    /// literals, then anything containing `://` is a URI, and the rest are DNS
    /// names. Every host lands in exactly one list.
    pub fn classify<S: AsRef<str>>(hosts: &[S]) -> Self {
        let mut names = Self::default();
        for host in hosts {
            let host = host.as_ref();
            if host.contains('@') {
                names.email_addresses.push(host.to_string());
            } else if let Ok(ip) = host.parse::<IpAddr>() {
                names.ip_addresses.push(ip);
            } else if host.contains("://") {
                names.uris.push(host.to_string());
            } else {
                names.dns_names.push(host.to_string());
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty()
            && self.ip_addresses.is_empty()
            && self.uris.is_empty()
            && self.email_addresses.is_empty()
    }

    /// Total number of names across all kinds.
    pub fn len(&self) -> usize {
        self.dns_names.len() + self.ip_addresses.len() + self.uris.len() + self.email_addresses.len()
    }

    /// Counts the names in an encoded SAN value that have no slot here, such
    /// as other names, directory names and registered IDs.
    pub fn uncarried_count(value: &[u8]) -> Result<usize, CertIssueError> {
        let san: x509_cert::ext::pkix::SubjectAltName = decode_strict(value)?;
        Ok(san.0.iter().filter(|name| !is_carried(name)).count())
    }

    fn to_general_names(&self) -> Result<Vec<GeneralName>, CertIssueError> {
        let ia5 = |value: &String| {
            Ia5String::new(value).map_err(|e| {
                CertIssueError::EncodingError(format!("subject alt name {value:?}: {e}"))
            })
        };
        let mut names = Vec::with_capacity(self.len());
        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(dns)?));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(ia5(email)?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }
        for uri in &self.uris {
            names.push(GeneralName::UniformResourceIdentifier(ia5(uri)?));
        }
        Ok(names)
    }

    fn from_general_names(general_names: &[GeneralName], critical: bool) -> Result<Self, CertIssueError> {
        let mut names = Self {
            critical,
            ..Self::default()
        };
        for name in general_names {
            match name {
                GeneralName::DnsName(dns) => names.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => names.email_addresses.push(email.to_string()),
                GeneralName::UniformResourceIdentifier(uri) => names.uris.push(uri.to_string()),
                GeneralName::IpAddress(octets) => {
                    let ip = match octets.as_bytes() {
                        bytes if bytes.len() == 4 => {
                            let mut v4 = [0u8; 4];
                            v4.copy_from_slice(bytes);
                            IpAddr::V4(Ipv4Addr::from(v4))
                        }
                        bytes if bytes.len() == 16 => {
                            let mut v6 = [0u8; 16];
                            v6.copy_from_slice(bytes);
                            IpAddr::V6(Ipv6Addr::from(v6))
                        }
                        bytes => {
                            return Err(CertIssueError::DecodingError(format!(
                                "IP address SAN with {} bytes",
                                bytes.len()
                            )));
                        }
                    };
                    names.ip_addresses.push(ip);
                }
                other => tracing::trace!(name = ?other, "subject alt name kind not carried"),
            }
        }
        Ok(names)
    }
}

fn is_carried(name: &GeneralName) -> bool {
    matches!(
        name,
        GeneralName::DnsName(_)
            | GeneralName::Rfc822Name(_)
            | GeneralName::UniformResourceIdentifier(_)
            | GeneralName::IpAddress(_)
    )
}

impl ExtensionCodec for SubjectAltNames {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_extension_value(&self) -> Result<Vec<u8>, CertIssueError> {
        let san = x509_cert::ext::pkix::SubjectAltName(self.to_general_names()?);
        san.to_der()
            .map_err(|e| CertIssueError::EncodingError(format!("subject alt name: {e}")))
    }

    fn from_extension_value(value: &[u8], critical: bool) -> Result<Self, CertIssueError> {
        let san: x509_cert::ext::pkix::SubjectAltName = decode_strict(value)?;
        Self::from_general_names(&san.0, critical)
    }

    fn is_critical(&self) -> bool {
        self.critical
    }
}
