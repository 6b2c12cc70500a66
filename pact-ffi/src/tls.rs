//! Self-signed CA certificate handed to consumers that want to trust mock
//! servers fronted by TLS.

use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

const CA_COMMON_NAME: &str = "Pact Mock Server CA";

/// Generate a self-signed CA certificate and return it as PEM.
///
/// # Errors
///
/// Returns an error if key generation or signing fails.
pub fn generate_ca_pem() -> Result<String, rcgen::Error> {
    let key = KeyPair::generate()?;
    let mut params = CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, CA_COMMON_NAME);
    params.distinguished_name = name;
    let cert = params.self_signed(&key)?;
    Ok(cert.pem())
}
