//! TLS acceptor creation
//!
//! The listener terminates TLS with OpenSSL. The identity comes either from
//! PEM files supplied by the user or from a freshly generated self-signed
//! certificate that only lives in memory.

use std::path::Path;

use log::{info, warn};
use openssl::pkey::PKey;
use openssl::ssl::{SslAcceptor, SslMethod, SslVerifyMode};
use openssl::x509::X509;

use super::cert::{generate_self_signed, CertOptions, PemIdentity};
use crate::common::{read_file, ResponderError, Result};
use crate::config::TlsSettings;

/// Read a PEM certificate (chain) and private key from disk
pub fn load_identity(cert_path: &Path, key_path: &Path) -> Result<PemIdentity> {
    Ok(PemIdentity {
        cert_pem: read_file(cert_path)?,
        key_pem: read_file(key_path)?,
    })
}

/// Create a TLS acceptor for a PEM identity
///
/// The first certificate in `cert_pem` is the leaf; any further ones are
/// sent as the chain. Client certificates are not requested.
pub fn create_tls_acceptor(identity: &PemIdentity) -> Result<SslAcceptor> {
    let mut certs = X509::stack_from_pem(&identity.cert_pem)?.into_iter();
    let leaf = certs
        .next()
        .ok_or_else(|| ResponderError::Other("No certificate found in PEM data".to_string()))?;
    let key = PKey::private_key_from_pem(&identity.key_pem)?;

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    acceptor.set_certificate(&leaf)?;
    for chain_cert in certs {
        acceptor.add_extra_chain_cert(chain_cert)?;
    }
    acceptor.set_private_key(&key)?;
    acceptor.check_private_key()?;
    acceptor.set_verify(SslVerifyMode::NONE);

    Ok(acceptor.build())
}

/// Build the acceptor described by the TLS settings
///
/// Uses the certificate/key files when both are given, otherwise generates
/// a self-signed identity for `settings.domain`.
pub fn build_acceptor(settings: &TlsSettings) -> Result<SslAcceptor> {
    let identity = match settings.identity_files() {
        Some((cert, key)) => {
            info!("Using certificate {} and key {}", cert.display(), key.display());
            load_identity(cert, key)?
        }
        None => {
            if settings.cert.is_some() != settings.key.is_some() {
                warn!("Both a certificate and a key are needed; generating a self-signed certificate instead");
            }
            info!(
                "Generating self-signed {} certificate for {}",
                settings.key_algorithm, settings.domain
            );
            let options =
                CertOptions::new(settings.domain.clone()).with_key_algorithm(settings.key_algorithm);
            generate_self_signed(&options)?
        }
    };

    create_tls_acceptor(&identity)
}
