//! Resolve the originating client IP address of an HTTP request.
//!
//! The lookup walks an ordered list of proxy and load-balancer headers and
//! falls back to the transport remote address. See [`ClientIpResolver`].

pub mod config;
pub mod error;
pub mod peer_addr;
pub mod resolver;
pub mod service;
pub mod util;

pub use peer_addr::PeerAddr;
pub use resolver::ClientIpResolver;
