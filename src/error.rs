//! use certissue::error::CertIssueError;

use const_oid::ObjectIdentifier;
use thiserror::Error;

/// Represents errors that can occur while building requests and issuing certificates.
///
/// Encoding, decoding and key classification failures are local: callers may skip
/// the offending item. Request creation and signing failures are terminal for the
/// operation and name the stage that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertIssueError {
    /// An extension or structure could not be encoded.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// A DER payload could not be decoded.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// An extension record carried a different object identifier than the decoder expects.
    #[error("Unexpected extension OID: expected {expected}, found {found}")]
    UnexpectedOid {
        expected: ObjectIdentifier,
        found: ObjectIdentifier,
    },

    /// An extension value decoded cleanly but left bytes unconsumed.
    #[error("Extension value has {0} trailing bytes")]
    TrailingBytes(usize),

    /// A key usage or extended key usage name is not in the registry.
    #[error("Unknown key usage: {0}")]
    UnknownUsage(String),

    /// Unsupported key type or failure of the underlying generator.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Key material does not match any recognized RSA size or EC curve.
    #[error("Unknown private key type")]
    UnknownKeyType,

    /// Building or signing a certificate request failed.
    #[error("Error creating certificate request ({stage}): {reason}")]
    RequestCreationError { stage: &'static str, reason: String },

    /// Building or signing a certificate failed.
    #[error("Error signing certificate ({stage}): {reason}")]
    SigningError { stage: &'static str, reason: String },

    /// Signed bytes could not be parsed back into a structure.
    #[error("Failed to parse {0}")]
    ParseError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CertIssueError {
    /// Returns true for every decoding failure kind, including OID mismatches and trailing bytes.
    pub fn is_decoding(&self) -> bool {
        matches!(
            self,
            CertIssueError::DecodingError(_)
                | CertIssueError::UnexpectedOid { .. }
                | CertIssueError::TrailingBytes(_)
        )
    }

    pub(crate) fn request(stage: &'static str, reason: impl ToString) -> Self {
        CertIssueError::RequestCreationError {
            stage,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn signing(stage: &'static str, reason: impl ToString) -> Self {
        CertIssueError::SigningError {
            stage,
            reason: reason.to_string(),
        }
    }
}

impl From<der::Error> for CertIssueError {
    /// Converts a `der::Error` into a `CertIssueError`.
    fn from(err: der::Error) -> Self {
        CertIssueError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertIssueError {
    fn from(err: rsa::Error) -> Self {
        CertIssueError::KeyGenerationError(err.to_string())
    }
}

impl From<pem::PemError> for CertIssueError {
    fn from(err: pem::PemError) -> Self {
        CertIssueError::ParseError(format!("PEM data: {err}"))
    }
}
