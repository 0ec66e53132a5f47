//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Where habits are kept
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    /// SQLite database file
    Sqlite(PathBuf),
    /// In-process store, lost on shutdown
    Memory,
}

/// Settings the server is started with
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreLocation,
    /// Directory uploaded images are written to
    pub uploads_dir: PathBuf,
    /// Base URL clients reach the server at, used to build image URLs
    pub public_url: String,
}

impl ServerConfig {
    pub fn new(port: u16, store: StoreLocation, uploads_dir: PathBuf) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            store,
            uploads_dir,
            public_url: format!("http://localhost:{}", port),
        }
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        if let Some(url) = public_url.filter(|url| !url.trim().is_empty()) {
            self.public_url = url;
        }
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
