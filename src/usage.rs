//! Name tables for key usage bits and extended key usage purposes.
//!
//! The tables are built once on first use and are read-only afterwards. Lookups
//! accept the canonical spelling (`DigitalSignature`) and its lower-cased form
//! (`digitalsignature`).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use const_oid::ObjectIdentifier;
use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsages;

use crate::error::CertIssueError;

/// An extended key usage purpose.
///
/// `Unknown` holds a purpose name that has no object identifier mapping. Such
/// purposes can be carried in parameters but are dropped when an extension is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtKeyUsage {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    IpsecEndSystem,
    IpsecTunnel,
    IpsecUser,
    TimeStamping,
    OcspSigning,
    MicrosoftServerGatedCrypto,
    NetscapeServerGatedCrypto,
    MicrosoftCommercialCodeSigning,
    MicrosoftKernelCodeSigning,
    Unknown(String),
}

const KEY_USAGES: [(&str, KeyUsages); 9] = [
    ("DigitalSignature", KeyUsages::DigitalSignature),
    ("ContentCommitment", KeyUsages::NonRepudiation),
    ("KeyEncipherment", KeyUsages::KeyEncipherment),
    ("DataEncipherment", KeyUsages::DataEncipherment),
    ("KeyAgreement", KeyUsages::KeyAgreement),
    ("CertSign", KeyUsages::KeyCertSign),
    ("CRLSign", KeyUsages::CRLSign),
    ("EncipherOnly", KeyUsages::EncipherOnly),
    ("DecipherOnly", KeyUsages::DecipherOnly),
];

const EXT_KEY_USAGES: [(&str, ExtKeyUsage, ObjectIdentifier); 14] = [
    (
        "Any",
        ExtKeyUsage::Any,
        ObjectIdentifier::new_unwrap("2.5.29.37.0"),
    ),
    (
        "ServerAuth",
        ExtKeyUsage::ServerAuth,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1"),
    ),
    (
        "ClientAuth",
        ExtKeyUsage::ClientAuth,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2"),
    ),
    (
        "CodeSigning",
        ExtKeyUsage::CodeSigning,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.3"),
    ),
    (
        "EmailProtection",
        ExtKeyUsage::EmailProtection,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.4"),
    ),
    (
        "IPSECEndSystem",
        ExtKeyUsage::IpsecEndSystem,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.5"),
    ),
    (
        "IPSECTunnel",
        ExtKeyUsage::IpsecTunnel,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.6"),
    ),
    (
        "IPSECUser",
        ExtKeyUsage::IpsecUser,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.7"),
    ),
    (
        "TimeStamping",
        ExtKeyUsage::TimeStamping,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.8"),
    ),
    (
        "OCSPSigning",
        ExtKeyUsage::OcspSigning,
        ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9"),
    ),
    (
        "MicrosoftServerGatedCrypto",
        ExtKeyUsage::MicrosoftServerGatedCrypto,
        ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.3"),
    ),
    (
        "NetscapeServerGatedCrypto",
        ExtKeyUsage::NetscapeServerGatedCrypto,
        ObjectIdentifier::new_unwrap("2.16.840.1.113730.4.1"),
    ),
    (
        "MicrosoftCommercialCodeSigning",
        ExtKeyUsage::MicrosoftCommercialCodeSigning,
        ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.22"),
    ),
    (
        "MicrosoftKernelCodeSigning",
        ExtKeyUsage::MicrosoftKernelCodeSigning,
        ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.61.1.1"),
    ),
];

struct Registry {
    key_usage_by_name: HashMap<String, KeyUsages>,
    ext_key_usage_by_name: HashMap<String, ExtKeyUsage>,
    oid_by_ext_key_usage: HashMap<ExtKeyUsage, ObjectIdentifier>,
    ext_key_usage_by_oid: HashMap<ObjectIdentifier, ExtKeyUsage>,
    key_usage_names: Vec<&'static str>,
    ext_key_usage_names: Vec<&'static str>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::build)
}

impl Registry {
    fn build() -> Self {
        let mut key_usage_by_name = HashMap::new();
        for (name, usage) in KEY_USAGES {
            key_usage_by_name.insert(name.to_string(), usage);
            key_usage_by_name.insert(name.to_lowercase(), usage);
        }

        let mut ext_key_usage_by_name = HashMap::new();
        let mut oid_by_ext_key_usage = HashMap::new();
        let mut ext_key_usage_by_oid = HashMap::new();
        for (name, usage, oid) in EXT_KEY_USAGES {
            ext_key_usage_by_name.insert(name.to_string(), usage.clone());
            ext_key_usage_by_name.insert(name.to_lowercase(), usage.clone());
            oid_by_ext_key_usage.insert(usage.clone(), oid);
            ext_key_usage_by_oid.insert(oid, usage);
        }

        Self {
            key_usage_by_name,
            ext_key_usage_by_name,
            oid_by_ext_key_usage,
            ext_key_usage_by_oid,
            key_usage_names: KEY_USAGES.iter().map(|(name, _)| *name).collect(),
            ext_key_usage_names: EXT_KEY_USAGES.iter().map(|(name, _, _)| *name).collect(),
        }
    }
}

/// Parses a key usage name into its single-bit mask.
pub fn parse_key_usage(name: &str) -> Result<FlagSet<KeyUsages>, CertIssueError> {
    registry()
        .key_usage_by_name
        .get(name.trim())
        .map(|usage| FlagSet::from(*usage))
        .ok_or_else(|| CertIssueError::UnknownUsage(name.to_string()))
}

/// Parses and combines several key usage names into one mask.
pub fn parse_key_usages<S: AsRef<str>>(
    names: &[S],
) -> Result<FlagSet<KeyUsages>, CertIssueError> {
    names.iter().try_fold(FlagSet::default(), |acc, name| {
        Ok(acc | parse_key_usage(name.as_ref())?)
    })
}

/// Known key usage names in declaration order.
pub fn list_key_usages() -> &'static [&'static str] {
    &registry().key_usage_names
}

/// Parses an extended key usage name, failing for names outside the registry.
pub fn parse_ext_key_usage(name: &str) -> Result<ExtKeyUsage, CertIssueError> {
    registry()
        .ext_key_usage_by_name
        .get(name.trim())
        .cloned()
        .ok_or_else(|| CertIssueError::UnknownUsage(name.to_string()))
}

/// Known extended key usage names in declaration order.
pub fn list_ext_key_usages() -> &'static [&'static str] {
    &registry().ext_key_usage_names
}

/// Looks up the object identifier of a purpose. `None` for purposes without a mapping.
///
/// An [`ExtKeyUsage::Unknown`] whose name is in the registry resolves like the
/// named purpose.
pub fn ext_key_usage_to_oid(usage: &ExtKeyUsage) -> Option<ObjectIdentifier> {
    let registry = registry();
    let usage = match usage {
        ExtKeyUsage::Unknown(name) => registry.ext_key_usage_by_name.get(name.trim())?,
        known => known,
    };
    registry.oid_by_ext_key_usage.get(usage).copied()
}

/// Inverse of [`ext_key_usage_to_oid`].
pub fn oid_to_ext_key_usage(oid: &ObjectIdentifier) -> Option<ExtKeyUsage> {
    registry().ext_key_usage_by_oid.get(oid).cloned()
}

impl ExtKeyUsage {
    /// Lenient constructor: names outside the registry become [`ExtKeyUsage::Unknown`].
    pub fn from_name(name: &str) -> Self {
        parse_ext_key_usage(name).unwrap_or_else(|_| ExtKeyUsage::Unknown(name.to_string()))
    }

    pub fn oid(&self) -> Option<ObjectIdentifier> {
        ext_key_usage_to_oid(self)
    }
}

impl FromStr for ExtKeyUsage {
    type Err = CertIssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ext_key_usage(s)
    }
}

impl fmt::Display for ExtKeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let ExtKeyUsage::Unknown(name) = self {
            return f.write_str(name);
        }
        let name = EXT_KEY_USAGES
            .iter()
            .find(|(_, usage, _)| usage == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("Unknown");
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_usage_lookup_is_case_insensitive() {
        let canonical = parse_key_usage("DigitalSignature").unwrap();
        let lower = parse_key_usage("digitalsignature").unwrap();
        assert_eq!(canonical, lower);
        assert!(canonical.contains(KeyUsages::DigitalSignature));
        assert_eq!(
            parse_key_usage("certsign").unwrap(),
            FlagSet::from(KeyUsages::KeyCertSign)
        );
    }

    #[test]
    fn test_unknown_key_usage_fails() {
        assert_eq!(
            parse_key_usage("Telepathy"),
            Err(CertIssueError::UnknownUsage("Telepathy".to_string()))
        );
    }

    #[test]
    fn test_parse_key_usages_combines_bits() {
        let mask = parse_key_usages(&["DigitalSignature", "keyencipherment"]).unwrap();
        assert_eq!(
            mask,
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        );
    }

    #[test]
    fn test_ext_key_usage_any_lower_case() {
        assert_eq!(parse_ext_key_usage("any").unwrap(), ExtKeyUsage::Any);
        assert_eq!(
            "OCSPSigning".parse::<ExtKeyUsage>().unwrap(),
            ExtKeyUsage::OcspSigning
        );
    }

    #[test]
    fn test_ext_key_usage_oid_table() {
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::ServerAuth).unwrap().to_string(),
            "1.3.6.1.5.5.7.3.1"
        );
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::NetscapeServerGatedCrypto)
                .unwrap()
                .to_string(),
            "2.16.840.1.113730.4.1"
        );
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::MicrosoftKernelCodeSigning)
                .unwrap()
                .to_string(),
            "1.3.6.1.4.1.311.61.1.1"
        );
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::Unknown("Bogus".to_string())),
            None
        );
    }

    #[test]
    fn test_unknown_with_registered_name_resolves() {
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::Unknown("ServerAuth".to_string())),
            ext_key_usage_to_oid(&ExtKeyUsage::ServerAuth)
        );
        assert_eq!(
            ext_key_usage_to_oid(&ExtKeyUsage::Unknown("codesigning".to_string())),
            ext_key_usage_to_oid(&ExtKeyUsage::CodeSigning)
        );
    }

    #[test]
    fn test_oid_lookup_is_inverse() {
        for name in list_ext_key_usages() {
            let usage = parse_ext_key_usage(name).unwrap();
            let oid = ext_key_usage_to_oid(&usage).unwrap();
            assert_eq!(oid_to_ext_key_usage(&oid), Some(usage.clone()));
            assert_eq!(usage.to_string(), *name);
        }
        let foreign = ObjectIdentifier::new_unwrap("1.2.3.4");
        assert_eq!(oid_to_ext_key_usage(&foreign), None);
    }

    #[test]
    fn test_listings() {
        assert_eq!(list_key_usages().len(), 9);
        assert_eq!(list_ext_key_usages().len(), 14);
        assert_eq!(list_key_usages()[1], "ContentCommitment");
        assert_eq!(
            ExtKeyUsage::from_name("Bogus"),
            ExtKeyUsage::Unknown("Bogus".to_string())
        );
    }
}
