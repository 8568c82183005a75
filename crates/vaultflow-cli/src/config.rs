//! CLI and server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};

/// Command-line interface for the vaultflow server.
#[derive(Debug, Parser)]
#[command(name = "vaultflow", version, about)]
pub struct Cli {
    /// HTTP server options.
    #[command(flatten)]
    pub server: ServerConfig,
}

/// HTTP server configuration.
///
/// Every option can also be set via environment variables:
/// `HOST`, `PORT` and `SHUTDOWN_TIMEOUT`.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address to bind the server to.
    ///
    /// Use "127.0.0.1" for localhost only, "0.0.0.0" for all interfaces.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// TCP port number for the server to listen on.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Maximum time in seconds to wait for in-flight workflow runs
    /// during graceful shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns whether the server binds to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        self.host.is_unspecified()
    }

    /// Returns the shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 3000,
            shutdown_timeout: 30,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["vaultflow"]).unwrap();
        assert_eq!(cli.server.server_addr().to_string(), "127.0.0.1:3000");
        assert!(!cli.server.binds_to_all_interfaces());
        assert_eq!(cli.server.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_cli_flags_override_defaults() {
        let cli =
            Cli::try_parse_from(["vaultflow", "--host", "0.0.0.0", "-p", "8080"]).unwrap();
        assert_eq!(cli.server.server_addr().to_string(), "0.0.0.0:8080");
        assert!(cli.server.binds_to_all_interfaces());
    }
}
