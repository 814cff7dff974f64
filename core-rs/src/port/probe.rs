/**
 * probe.rs
 * Port availability probes
 *
 * A probe answers one question: can a listener be started on host:port
 * right now? Two strategies:
 * - Connect: something accepted the connection → port is taken
 * - Bind: binding succeeded → port is free
 *
 * Every probe opens at most one socket, and it is dropped before the call
 * returns on every path.
 */

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::trace;

/// Default connect timeout for [`ConnectProbe`]
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 250;

/// Capability to test whether a port is free to bind
pub trait PortProbe {
    /// Returns true if `port` on `host` can be used for a new listener
    fn is_port_free(&self, host: &str, port: u16) -> bool;
}

impl<P: PortProbe + ?Sized> PortProbe for Box<P> {
    fn is_port_free(&self, host: &str, port: u16) -> bool {
        (**self).is_port_free(host, port)
    }
}

impl<P: PortProbe + ?Sized> PortProbe for &P {
    fn is_port_free(&self, host: &str, port: u16) -> bool {
        (**self).is_port_free(host, port)
    }
}

/// Probe strategy selected from config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Connect,
    Bind,
}

/// Probe that attempts a TCP connection to the candidate port
#[derive(Debug, Clone)]
pub struct ConnectProbe {
    timeout: Duration,
}

impl ConnectProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ConnectProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS))
    }
}

impl PortProbe for ConnectProbe {
    fn is_port_free(&self, host: &str, port: u16) -> bool {
        let addr = match resolve(host, port) {
            Some(addr) => addr,
            None => return false,
        };

        match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(_stream) => {
                trace!(host, port, "port answered, in use");
                false
            }
            Err(_) => true,
        }
    }
}

/// Probe that attempts to bind the candidate port
#[derive(Debug, Clone, Default)]
pub struct BindProbe;

impl PortProbe for BindProbe {
    fn is_port_free(&self, host: &str, port: u16) -> bool {
        match resolve(host, port) {
            Some(addr) => TcpListener::bind(addr).is_ok(),
            None => false,
        }
    }
}

/// Build a boxed probe for the configured method
pub fn probe_for(method: ProbeMethod, timeout_ms: u64) -> Box<dyn PortProbe> {
    match method {
        ProbeMethod::Connect => Box::new(ConnectProbe::new(Duration::from_millis(timeout_ms))),
        ProbeMethod::Bind => Box::new(BindProbe),
    }
}

fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
    (host, port).to_socket_addrs().ok()?.next()
}
