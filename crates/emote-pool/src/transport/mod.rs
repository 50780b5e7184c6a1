//! Transport layer for the status endpoint.
//!
//! Chat is a transport too, but it lives in `chat` behind its own traits.

pub mod http;

pub use http::{ServerConfig, serve};
