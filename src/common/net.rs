//! Network utility functions
//!
//! Address resolution restricted to IPv4 and the free-port fallback used at
//! startup when the requested address is already taken.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::str::FromStr;

use log::debug;

use super::error::{ResponderError, Result};

/// Parse a listen address into an IPv4 socket address
///
/// Literal addresses are parsed directly; host names are resolved and the
/// first IPv4 result is used.
///
/// # Arguments
///
/// * `addr` - The address string to parse (`host:port`)
pub fn parse_ipv4_addr(addr: &str) -> Result<SocketAddr> {
    if let Ok(socket_addr) = SocketAddr::from_str(addr) {
        if socket_addr.is_ipv4() {
            return Ok(socket_addr);
        }
        return Err(ResponderError::Other(format!(
            "Only IPv4 listen addresses are supported: {}",
            addr
        )));
    }

    let addrs = addr
        .to_socket_addrs()
        .map_err(|e| ResponderError::Other(format!("Failed to parse address {}: {}", addr, e)))?;

    addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ResponderError::Other(format!("No IPv4 address for {}", addr)))
}

/// Check whether the address can currently be bound
pub fn can_listen_on(addr: &str) -> bool {
    match parse_ipv4_addr(addr) {
        Ok(socket_addr) => TcpListener::bind(socket_addr).is_ok(),
        Err(_) => false,
    }
}

/// Keep the host of `addr` but swap the port for a free one
pub fn random_listen_address(addr: &str) -> Result<SocketAddr> {
    let mut socket_addr = parse_ipv4_addr(addr)?;

    let listener = TcpListener::bind(SocketAddr::new(socket_addr.ip(), 0))
        .map_err(|e| ResponderError::bind(addr, e))?;
    let port = listener.local_addr()?.port();
    drop(listener);

    debug!("Picked free port {} for {}", port, socket_addr.ip());
    socket_addr.set_port(port);
    Ok(socket_addr)
}
