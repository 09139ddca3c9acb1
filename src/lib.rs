//! ferry - client/server file transfer over a length-prefixed typed
//! binary protocol.
//!
//! A server exposes a flat directory of files over TCP; clients fetch,
//! store, delete, and list them. File bytes are streamed through a
//! fixed-capacity per-connection buffer rather than buffered whole, and
//! every stored file sits behind its own reader/writer lock so concurrent
//! operations on the same name stay ordered while different names never
//! contend.

pub mod client;
pub mod config;
pub mod registry;
pub mod server;
pub mod transfer;

pub use client::Client;
pub use config::{ClientConfig, ServerConfig};
pub use registry::{FileHandle, FileRegistry, ReadLockedFile};
pub use server::Server;
