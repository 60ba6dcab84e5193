//! TLS handling module
//!
//! Acceptor construction and in-memory self-signed identities.

mod acceptor;
pub mod cert;

pub use acceptor::{build_acceptor, create_tls_acceptor, load_identity};
pub use cert::{generate_self_signed, CertOptions, EcCurve, KeyAlgorithm, PemIdentity};
