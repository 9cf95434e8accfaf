use hyper::Request;

use crate::peer_addr::PeerAddr;
use crate::resolver::ClientIpResolver;
use crate::service::ClientIp;

pub trait RequestExt {
  /// Peer address of the connection as `ip:port`, empty when unknown.
  fn remote_addr(&self) -> String;

  fn resolve_client_ip(&self, resolver: &ClientIpResolver) -> String;

  /// Client IP stored by [`ClientIpLayer`](crate::service::ClientIpLayer).
  fn client_ip(&self) -> Option<&ClientIp>;
}

impl<B> RequestExt for Request<B> {
  fn remote_addr(&self) -> String {
    self.extensions().get::<PeerAddr>().map(ToString::to_string).unwrap_or_default()
  }

  fn resolve_client_ip(&self, resolver: &ClientIpResolver) -> String {
    resolver.resolve(self.headers(), &self.remote_addr())
  }

  fn client_ip(&self) -> Option<&ClientIp> {
    self.extensions().get::<ClientIp>()
  }
}
