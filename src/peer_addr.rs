use std::fmt::Display;
use std::fmt::Formatter;
use std::net::SocketAddr;

/// Transport peer of the connection a request arrived on, stored as a request extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PeerAddr(pub SocketAddr);

impl Display for PeerAddr {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Display::fmt(&self.0, f)
  }
}
