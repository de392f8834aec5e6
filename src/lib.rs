//! # CertIssue - Certificate Issuance in Pure Rust
//!
//! CertIssue is the issuance core of a private certificate authority, built on the
//! RustCrypto crates. It builds certificate signing requests with typed extensions,
//! derives certificate templates from requests and signs them under a validity
//! window that never outlives the issuing authority.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048, 3072, and 4096-bit keys, signing with SHA-256
//! - **ECDSA**: P-256, P-384, and P-521 curves, signing with SHA-256, SHA-384 and SHA-512
//!
//! ## Pipeline
//!
//! A request flows through four stages:
//!
//! 1. [`key::KeyPair::generate`] creates key material.
//! 2. [`request::build_csr`] builds and signs a PKCS#10 request, sorting hosts into
//!    DNS, IP, URI and email SANs.
//! 3. [`template::derive_template`] turns the request into a certificate template.
//! 4. [`signer::sign`] signs the template with an authority, or self-signs it.
//!
//! [`tls::request_tls_certificate`] runs all four for a TLS server certificate.
//!
//! ## Quick Start
//!
//! ### Creating a Root CA and a Server Certificate
//!
//! ```rust,no_run
//! use certissue::{
//!     cert::params::{CsrParameters, DistinguishedName, SigningParameters},
//!     key::{KeyPair, KeyType},
//!     request::build_csr,
//!     signer::sign_request,
//!     tls::request_tls_certificate,
//!     validity,
//! };
//! use x509_cert::ext::pkix::KeyUsages;
//!
//! # fn main() -> Result<(), certissue::error::CertIssueError> {
//! let ca_key = KeyPair::generate(KeyType::EcP384)?;
//! let ca_subject = DistinguishedName::builder()
//!     .common_name("Example Root CA".to_string())
//!     .organization("Example Corp".to_string())
//!     .build();
//! let ca_params = CsrParameters::builder()
//!     .is_ca(true)
//!     .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
//!     .build();
//! let ca_csr = build_csr::<&str>(&ca_subject, &ca_params, &ca_key, &[])?;
//!
//! let ca_signing = SigningParameters::builder()
//!     .serial_number(SigningParameters::random_serial())
//!     .not_after(validity::ca_not_after(time::Duration::ZERO, &[]))
//!     .build();
//! let ca_cert = sign_request(&ca_csr, None, &ca_key, &ca_signing)?;
//!
//! let server_signing = SigningParameters::builder()
//!     .serial_number(SigningParameters::random_serial())
//!     .not_after(validity::not_after(time::Duration::days(90), &[&ca_cert]))
//!     .build();
//! let server = request_tls_certificate(
//!     &ca_cert,
//!     &ca_key,
//!     &server_signing,
//!     KeyType::EcP256,
//!     &["server.example.com", "10.0.0.5"],
//! )?;
//!
//! println!("{}", server.chain_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::CertIssueError`]:
//!
//! ```rust
//! use certissue::{error::CertIssueError, key::KeyType};
//!
//! match "rsa1024".parse::<KeyType>() {
//!     Ok(key_type) => println!("Key type: {key_type}"),
//!     Err(CertIssueError::KeyGenerationError(msg)) => println!("Unsupported key type: {msg}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`usage`]: Key usage and extended key usage name registry
//! - [`cert`]: Certificates, extension codecs and request parameters
//! - [`key`]: Key generation, import/export, signing and verification
//! - [`request`]: Certificate signing request construction and parsing
//! - [`template`]: Request-to-template derivation
//! - [`signer`]: Template signing
//! - [`validity`]: Validity window policy
//! - [`tls`]: One-call TLS certificate issuance
//! - [`pem_utils`]: PEM encoding and decoding helpers
//! - [`error`]: Error types

pub mod cert;
pub mod error;
pub mod key;
pub mod pem_utils;
pub mod request;
pub mod signer;
mod tbs_certificate;
pub mod template;
pub mod tls;
pub mod usage;
pub mod validity;
