use der::Encode;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::params::ExtensionRecord;
use crate::error::CertIssueError;
use crate::validity::to_x509_time;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm the issuer signs with.
/// * `issuer` - The issuer name, byte-equal to the authority's subject.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The subject name.
/// * `subject_public_key_info` - The subject public key, as requested.
/// * `extensions` - X.509 extensions, in output order.
pub(crate) struct TbsCertificate {
    pub serial_number: u64,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: Name,
    pub not_before: time::OffsetDateTime,
    pub not_after: time::OffsetDateTime,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionRecord>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner, CertIssueError> {
        let stage = |stage: &'static str| move |e: CertIssueError| CertIssueError::signing(stage, e);

        let extensions = self
            .extensions
            .iter()
            .map(ExtensionRecord::to_x509_extension)
            .collect::<Result<Vec<_>, _>>()
            .map_err(stage("extensions"))?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before).map_err(stage("validity"))?,
            not_after: to_x509_time(self.not_after).map_err(stage("validity"))?,
        };

        let serial_number = SerialNumber::new(&self.serial_number.to_be_bytes())
            .map_err(|e| CertIssueError::signing("serial number", e))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.clone(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// DER encoding of the TBS structure, the bytes the issuer signs.
    pub fn to_der(&self) -> Result<(TbsCertificateInner, Vec<u8>), CertIssueError> {
        let inner = self.to_tbs_certificate_inner()?;
        let der = inner
            .to_der()
            .map_err(|e| CertIssueError::signing("tbs encoding", e))?;
        Ok((inner, der))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyPair, KeyType};
    use time::macros::datetime;
    use x509_cert::time::Time;

    #[test]
    fn test_serial_and_validity_encoding() {
        let key = KeyPair::generate(KeyType::EcP256).unwrap();
        let tbs = TbsCertificate {
            serial_number: 0x0102,
            signature_algorithm: key.signature_algorithm(),
            issuer: Name::default(),
            not_before: datetime!(2024-01-01 00:00 UTC),
            not_after: datetime!(2060-01-01 00:00 UTC),
            subject: Name::default(),
            subject_public_key_info: key.public_key().to_spki().unwrap(),
            extensions: Vec::new(),
        };
        let (inner, der) = tbs.to_der().unwrap();
        assert!(!der.is_empty());
        assert_eq!(inner.serial_number.as_bytes(), &[0x01, 0x02]);
        assert!(matches!(inner.validity.not_before, Time::UtcTime(_)));
        assert!(matches!(inner.validity.not_after, Time::GeneralTime(_)));
        assert!(inner.extensions.is_none());
    }
}
