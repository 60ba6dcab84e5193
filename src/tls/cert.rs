//! Self-signed certificate generation
//!
//! Builds an in-memory TLS identity for the listener when no certificate is
//! supplied. Generation is a pure function of [`CertOptions`]: nothing is
//! written to disk and no server state is involved.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509NameBuilder, X509};

use crate::common::{ResponderError, Result};

/// Validity of a generated certificate
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// RSA modulus size used unless told otherwise
pub const DEFAULT_RSA_BITS: u32 = 2048;

/// Organization written in the certificate subject
pub const DEFAULT_ORGANIZATION: &str = "Acme Co";

/// NIST curves accepted for ECDSA keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P224,
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn nid(self) -> Nid {
        match self {
            EcCurve::P224 => Nid::SECP224R1,
            EcCurve::P256 => Nid::X9_62_PRIME256V1,
            EcCurve::P384 => Nid::SECP384R1,
            EcCurve::P521 => Nid::SECP521R1,
        }
    }
}

/// Key type of a generated certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa { bits: u32 },
    Ecdsa(EcCurve),
    Ed25519,
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Rsa {
            bits: DEFAULT_RSA_BITS,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "rsa:{}", bits),
            KeyAlgorithm::Ecdsa(EcCurve::P224) => write!(f, "p224"),
            KeyAlgorithm::Ecdsa(EcCurve::P256) => write!(f, "p256"),
            KeyAlgorithm::Ecdsa(EcCurve::P384) => write!(f, "p384"),
            KeyAlgorithm::Ecdsa(EcCurve::P521) => write!(f, "p521"),
            KeyAlgorithm::Ed25519 => write!(f, "ed25519"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = ResponderError;

    /// Accepts `rsa`, `rsa:<bits>`, `p224`, `p256`, `p384`, `p521` and `ed25519`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "rsa" => Ok(KeyAlgorithm::default()),
            "p224" | "p-224" => Ok(KeyAlgorithm::Ecdsa(EcCurve::P224)),
            "p256" | "p-256" => Ok(KeyAlgorithm::Ecdsa(EcCurve::P256)),
            "p384" | "p-384" => Ok(KeyAlgorithm::Ecdsa(EcCurve::P384)),
            "p521" | "p-521" => Ok(KeyAlgorithm::Ecdsa(EcCurve::P521)),
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            other => match other.strip_prefix("rsa:").map(str::parse::<u32>) {
                Some(Ok(bits)) if bits >= 1024 => Ok(KeyAlgorithm::Rsa { bits }),
                _ => Err(ResponderError::CertGen(format!(
                    "Unrecognized key type: {:?} (expected rsa, rsa:<bits>, p224, p256, p384, p521 or ed25519)",
                    s
                ))),
            },
        }
    }
}

/// Parameters of a generated certificate
#[derive(Debug, Clone)]
pub struct CertOptions {
    /// Comma-separated host names and IP addresses
    pub hosts: String,
    pub organization: String,
    /// Start of validity; `None` means now
    pub valid_from: Option<SystemTime>,
    pub valid_for: Duration,
    /// Mark the certificate as its own CA
    pub is_ca: bool,
    pub key_algorithm: KeyAlgorithm,
}

impl CertOptions {
    /// Defaults for the given hosts
    pub fn new(hosts: impl Into<String>) -> Self {
        Self {
            hosts: hosts.into(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            valid_from: None,
            valid_for: DEFAULT_VALIDITY,
            is_ca: false,
            key_algorithm: KeyAlgorithm::default(),
        }
    }

    /// Use a different key type
    pub fn with_key_algorithm(mut self, key_algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = key_algorithm;
        self
    }
}

/// PEM-encoded certificate and PKCS#8 private key
#[derive(Clone)]
pub struct PemIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for PemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PemIdentity")
            .field("cert_pem", &format!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

fn cert_err(what: &str) -> impl FnOnce(openssl::error::ErrorStack) -> ResponderError + '_ {
    move |e| ResponderError::CertGen(format!("Failed to {}: {}", what, e))
}

fn generate_key(algorithm: KeyAlgorithm) -> Result<PKey<Private>> {
    let key = match algorithm {
        KeyAlgorithm::Rsa { bits } => Rsa::generate(bits).and_then(PKey::from_rsa),
        KeyAlgorithm::Ecdsa(curve) => EcGroup::from_curve_name(curve.nid())
            .and_then(|group| EcKey::generate(&group))
            .and_then(PKey::from_ec_key),
        KeyAlgorithm::Ed25519 => PKey::generate_ed25519(),
    };
    key.map_err(cert_err("generate private key"))
}

fn unix_seconds(time: SystemTime) -> Result<i64> {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ResponderError::CertGen(format!("Invalid creation date: {}", e)))?
        .as_secs();
    i64::try_from(secs).map_err(|e| ResponderError::CertGen(format!("Invalid creation date: {}", e)))
}

/// Generate a self-signed certificate and its private key
///
/// Hosts that parse as IP addresses go into IP SANs, the rest into DNS SANs;
/// the first host is also the subject common name.
pub fn generate_self_signed(options: &CertOptions) -> Result<PemIdentity> {
    let hosts: Vec<&str> = options
        .hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();
    if hosts.is_empty() {
        return Err(ResponderError::CertGen("Empty host value".to_string()));
    }

    let key = generate_key(options.key_algorithm)?;

    let not_before_secs = unix_seconds(options.valid_from.unwrap_or_else(SystemTime::now))?;
    let valid_for = i64::try_from(options.valid_for.as_secs())
        .map_err(|e| ResponderError::CertGen(format!("Invalid validity: {}", e)))?;
    let not_before = Asn1Time::from_unix(not_before_secs as _).map_err(cert_err("encode start date"))?;
    let not_after = Asn1Time::from_unix((not_before_secs + valid_for) as _)
        .map_err(cert_err("encode end date"))?;

    let serial = {
        let mut bn = BigNum::new().map_err(cert_err("generate serial number"))?;
        bn.rand(128, MsbOption::MAYBE_ZERO, false)
            .map_err(cert_err("generate serial number"))?;
        bn.to_asn1_integer().map_err(cert_err("generate serial number"))?
    };

    let mut name = X509NameBuilder::new().map_err(cert_err("build subject"))?;
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, &options.organization)
        .map_err(cert_err("build subject"))?;
    name.append_entry_by_nid(Nid::COMMONNAME, hosts[0])
        .map_err(cert_err("build subject"))?;
    let name = name.build();

    let mut builder = X509::builder().map_err(cert_err("create certificate"))?;
    builder.set_version(2).map_err(cert_err("set version"))?;
    builder.set_serial_number(&serial).map_err(cert_err("set serial number"))?;
    builder.set_subject_name(&name).map_err(cert_err("set subject"))?;
    builder.set_issuer_name(&name).map_err(cert_err("set issuer"))?;
    builder.set_pubkey(&key).map_err(cert_err("set public key"))?;
    builder.set_not_before(&not_before).map_err(cert_err("set start date"))?;
    builder.set_not_after(&not_after).map_err(cert_err("set end date"))?;

    let mut constraints = BasicConstraints::new();
    constraints.critical();
    if options.is_ca {
        constraints.ca();
    }
    builder
        .append_extension(constraints.build().map_err(cert_err("build basic constraints"))?)
        .map_err(cert_err("add basic constraints"))?;

    // Key encipherment only applies to RSA key exchange
    let mut usage = KeyUsage::new();
    usage.critical().digital_signature();
    if matches!(options.key_algorithm, KeyAlgorithm::Rsa { .. }) {
        usage.key_encipherment();
    }
    if options.is_ca {
        usage.key_cert_sign();
    }
    builder
        .append_extension(usage.build().map_err(cert_err("build key usage"))?)
        .map_err(cert_err("add key usage"))?;

    builder
        .append_extension(
            ExtendedKeyUsage::new()
                .server_auth()
                .build()
                .map_err(cert_err("build extended key usage"))?,
        )
        .map_err(cert_err("add extended key usage"))?;

    let mut san = SubjectAlternativeName::new();
    for host in &hosts {
        if host.parse::<IpAddr>().is_ok() {
            san.ip(host);
        } else {
            san.dns(host);
        }
    }
    let san = san
        .build(&builder.x509v3_context(None, None))
        .map_err(cert_err("build subject alternative names"))?;
    builder.append_extension(san).map_err(cert_err("add subject alternative names"))?;

    // Ed25519 signs the message directly, without a separate digest
    let digest = match options.key_algorithm {
        KeyAlgorithm::Ed25519 => MessageDigest::null(),
        _ => MessageDigest::sha256(),
    };
    builder.sign(&key, digest).map_err(cert_err("sign certificate"))?;
    let cert = builder.build();

    debug!(
        "Generated {} self-signed certificate for {}",
        options.key_algorithm,
        hosts.join(",")
    );

    Ok(PemIdentity {
        cert_pem: cert.to_pem().map_err(cert_err("encode certificate"))?,
        key_pem: key
            .private_key_to_pem_pkcs8()
            .map_err(cert_err("encode private key"))?,
    })
}
