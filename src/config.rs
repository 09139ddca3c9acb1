//! Explicit configuration passed into the server and client constructors.
//! There is no ambient state: the storage root travels with the config.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:4040`.
    pub addr: String,
    /// Flat directory holding the stored files.
    pub root: PathBuf,
}

impl ServerConfig {
    pub fn new(addr: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            root: root.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub addr: String,
    /// Flat directory files are uploaded from and downloaded into.
    pub root: PathBuf,
}

impl ClientConfig {
    pub fn new(addr: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            root: root.into(),
        }
    }
}
