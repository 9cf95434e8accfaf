use std::fmt::Display;
use std::fmt::Formatter;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use hyper::Request;
use tower::Layer;
use tower::Service;

use crate::resolver::ClientIpResolver;
use crate::util::request_ext::RequestExt;

/// Client IP resolved for a request, empty when nothing matched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientIp(String);

impl ClientIp {
  pub fn new(ip: String) -> Self {
    Self(ip)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn ip(&self) -> Option<IpAddr> {
    IpAddr::from_str(&self.0).ok()
  }
}

impl Display for ClientIp {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Resolves the client IP once per request and stores it as a [`ClientIp`] extension.
#[derive(Clone, Debug)]
pub struct ClientIpService<S> {
  inner: S,
  resolver: Arc<ClientIpResolver>,
}

impl<S> ClientIpService<S> {
  pub fn new(inner: S, resolver: Arc<ClientIpResolver>) -> Self {
    Self { inner, resolver }
  }
}

impl<S, B> Service<Request<B>> for ClientIpService<S>
where
  S: Service<Request<B>>,
{
  type Response = S::Response;
  type Error = S::Error;
  type Future = S::Future;

  fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, mut req: Request<B>) -> Self::Future {
    let client_ip = ClientIp::new(req.resolve_client_ip(&self.resolver));
    req.extensions_mut().insert(client_ip);
    self.inner.call(req)
  }
}

#[derive(Clone, Debug, Default)]
pub struct ClientIpLayer {
  resolver: Arc<ClientIpResolver>,
}

impl ClientIpLayer {
  pub fn new(resolver: Arc<ClientIpResolver>) -> Self {
    Self { resolver }
  }
}

impl<S> Layer<S> for ClientIpLayer {
  type Service = ClientIpService<S>;

  fn layer(&self, inner: S) -> Self::Service {
    ClientIpService::new(inner, self.resolver.clone())
  }
}
