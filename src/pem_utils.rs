use crate::cert::Certificate;
use crate::error::CertIssueError;
use crate::key::KeyPair;
use crate::request::CertificateRequest;

pub const CERTIFICATE_BLOCK_TYPE: &str = "CERTIFICATE";
pub const RSA_KEY_BLOCK_TYPE: &str = "RSA PRIVATE KEY";
pub const EC_KEY_BLOCK_TYPE: &str = "EC PRIVATE KEY";
pub const CERTIFICATE_REQUEST_BLOCK_TYPE: &str = "CERTIFICATE REQUEST";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, encode_config())
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>, pem::PemError> {
    let pem = pem::parse(pem_str)?;
    Ok(pem.contents().to_vec())
}

fn encode_config() -> pem::EncodeConfig {
    pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF)
}

/// Concatenates the PEM encodings of `certs`, in order.
pub fn encode_certificates(certs: &[Certificate]) -> String {
    let blocks: Vec<pem::Pem> = certs
        .iter()
        .map(|cert| pem::Pem::new(CERTIFICATE_BLOCK_TYPE, cert.to_der()))
        .collect();
    pem::encode_many_config(&blocks, encode_config())
}

/// Concatenates the PEM encodings of `keys`, in order.
///
/// RSA keys are written as PKCS#1, EC keys as SEC1.
pub fn encode_keys(keys: &[KeyPair]) -> Result<String, CertIssueError> {
    let mut blocks = Vec::with_capacity(keys.len());
    for key in keys {
        blocks.push(pem::Pem::new(key.pem_label(), key.to_der()?));
    }
    Ok(pem::encode_many_config(&blocks, encode_config()))
}

/// Concatenates the PEM encodings of `requests`, in order.
pub fn encode_requests(requests: &[CertificateRequest]) -> String {
    let blocks: Vec<pem::Pem> = requests
        .iter()
        .map(|csr| pem::Pem::new(CERTIFICATE_REQUEST_BLOCK_TYPE, csr.to_der()))
        .collect();
    pem::encode_many_config(&blocks, encode_config())
}

/// Parses every `CERTIFICATE` block in `pem_str`.
///
/// Blocks of other types, and blocks carrying headers, are skipped. A
/// certificate block that fails to parse fails the whole call.
pub fn load_certificates_from_pem(pem_str: &str) -> Result<Vec<Certificate>, CertIssueError> {
    let mut certs = Vec::new();
    for block in pem::parse_many(pem_str)? {
        if block.tag() != CERTIFICATE_BLOCK_TYPE || has_headers(&block) {
            tracing::trace!(tag = block.tag(), "skipping PEM block");
            continue;
        }
        certs.push(Certificate::from_der(block.contents())?);
    }
    Ok(certs)
}

/// Parses every RSA or EC private key block in `pem_str`, skipping other block types.
pub fn load_private_keys_from_pem(pem_str: &str) -> Result<Vec<KeyPair>, CertIssueError> {
    let mut keys = Vec::new();
    for block in pem::parse_many(pem_str)? {
        match block.tag() {
            RSA_KEY_BLOCK_TYPE | EC_KEY_BLOCK_TYPE => {
                keys.push(KeyPair::from_der(block.tag(), block.contents())?);
            }
            tag => tracing::trace!(tag, "skipping PEM block"),
        }
    }
    Ok(keys)
}

fn has_headers(block: &pem::Pem) -> bool {
    block.headers().iter().next().is_some()
}

/// Turns a certificate common name into something usable as a file name.
///
/// `*.example.com` becomes `STAR_example_com`.
pub fn common_name_to_file_name(common_name: &str) -> String {
    common_name
        .replace('.', "_")
        .replace(' ', "")
        .replace('*', "STAR")
}
