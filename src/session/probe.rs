use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// SMB, which carries the remote registry named pipe.
pub const DEFAULT_PROBE_PORT: u16 = 445;

/// Bounded TCP connect used to fail fast on hosts that are down or filtered
/// before handing them to a platform call with no timeout of its own.
#[derive(Debug, Clone, Copy)]
pub struct ReachabilityProbe {
    pub port: u16,
    pub timeout: Duration,
}

impl Default for ReachabilityProbe {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROBE_PORT,
            timeout: Duration::from_millis(3000),
        }
    }
}

impl ReachabilityProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Succeeds as soon as one resolved address accepts a connection.
    pub fn check(&self, host: &str) -> io::Result<()> {
        let addrs = (host, self.port).to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", host),
            )
        }))
    }
}
