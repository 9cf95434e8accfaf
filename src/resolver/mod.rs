pub mod extract;

use std::net::IpAddr;
use std::net::SocketAddr;
use std::str::FromStr;

use hyper::HeaderMap;
use hyper::header::HeaderName;
use serde::Deserialize;
use tracing::debug;
use tracing::trace;

pub use extract::Extractor;
pub use extract::is_ip;

use crate::resolver::extract::header_value;

/// Default lookup order, highest precedence first.
pub const DEFAULT_SOURCES: [(&str, Extractor); 10] = [
  // Amazon EC2, Heroku and others.
  ("x-client-ip", Extractor::Single),
  // Load balancers (AWS ELB) and most proxies.
  ("x-forwarded-for", Extractor::ForwardedFor),
  ("cf-connecting-ip", Extractor::Single),
  // Fastly, and Firebase hosting when forwarding to cloud functions.
  ("fastly-client-ip", Extractor::Single),
  // Akamai and Cloudflare.
  ("true-client-ip", Extractor::Single),
  // nginx proxy/fcgi default.
  ("x-real-ip", Extractor::Single),
  // Rackspace LB and Riverbed Stingray.
  ("x-cluster-client-ip", Extractor::Single),
  ("x-forwarded", Extractor::Single),
  ("forwarded-for", Extractor::Single),
  ("forwarded", Extractor::Single),
];

/// A header consulted by the resolver and how its value is read.
#[derive(Clone, Debug)]
pub struct Source {
  name: HeaderName,
  extractor: Extractor,
}

impl Source {
  pub fn new(name: HeaderName, extractor: Extractor) -> Self {
    Self { name, extractor }
  }

  pub fn name(&self) -> &HeaderName {
    &self.name
  }

  pub fn extractor(&self) -> Extractor {
    self.extractor
  }

  fn extract(&self, headers: &HeaderMap) -> Option<String> {
    let value = header_value(headers, &self.name)?;
    self.extractor.extract(&value).map(str::to_string)
  }
}

/// What to do with the transport remote address once no header matched.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteAddrPolicy {
  /// Validate the string as given. `ip:port` never validates.
  #[default]
  Raw,
  /// Accept `ip:port` and `[ipv6]:port`, keeping the address part.
  StripPort,
}

impl RemoteAddrPolicy {
  fn extract(self, remote_addr: &str) -> Option<String> {
    if is_ip(remote_addr) {
      return Some(remote_addr.to_string());
    }

    match self {
      RemoteAddrPolicy::Raw => None,
      RemoteAddrPolicy::StripPort => {
        SocketAddr::from_str(remote_addr).ok().map(|socket| socket.ip().to_string())
      }
    }
  }
}

/// Resolves the originating client IP from request headers and the remote address.
///
/// Sources are tried in order and the first valid address wins. The resolver
/// holds no mutable state and can be shared freely between threads.
#[derive(Clone, Debug)]
pub struct ClientIpResolver {
  sources: Vec<Source>,
  remote_addr: RemoteAddrPolicy,
}

impl ClientIpResolver {
  pub fn new(sources: Vec<Source>) -> Self {
    Self { sources, remote_addr: RemoteAddrPolicy::default() }
  }

  pub fn with_remote_addr_policy(mut self, policy: RemoteAddrPolicy) -> Self {
    self.remote_addr = policy;
    self
  }

  pub fn sources(&self) -> &[Source] {
    &self.sources
  }

  pub fn remote_addr_policy(&self) -> RemoteAddrPolicy {
    self.remote_addr
  }

  /// Returns the first valid client IP, or an empty string when none is found.
  pub fn resolve(&self, headers: &HeaderMap, remote_addr: &str) -> String {
    for source in &self.sources {
      if let Some(ip) = source.extract(headers) {
        trace!(header = source.name.as_str(), %ip, "client ip resolved from header");
        return ip;
      }
    }

    if let Some(ip) = self.remote_addr.extract(remote_addr) {
      trace!(%ip, "client ip resolved from remote address");
      return ip;
    }

    debug!(remote_addr, "no valid client ip found");
    String::new()
  }

  /// Same lookup as [`resolve`](Self::resolve), parsed into an [`IpAddr`].
  pub fn resolve_ip(&self, headers: &HeaderMap, remote_addr: &str) -> Option<IpAddr> {
    IpAddr::from_str(&self.resolve(headers, remote_addr)).ok()
  }
}

impl Default for ClientIpResolver {
  fn default() -> Self {
    let sources = DEFAULT_SOURCES
      .into_iter()
      .map(|(name, extractor)| Source::new(HeaderName::from_static(name), extractor))
      .collect();
    Self::new(sources)
  }
}
