use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use hyper::Request;
use hyper::Response;
use hyper::header::REFERER;
use hyper::header::USER_AGENT;
use tower::Layer;
use tower::Service;
use tracing::info;

use crate::util::request_ext::RequestExt;

/// Logs one line per request on the `reqip::access` target once the response is ready.
///
/// Expects [`ClientIpLayer`](crate::service::ClientIpLayer) further out in the stack.
#[derive(Clone, Debug)]
pub struct AccessLog<S> {
  inner: S,
}

impl<S> AccessLog<S> {
  pub fn new(inner: S) -> Self {
    Self { inner }
  }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AccessLog<S>
where
  S: Service<Request<ReqBody>, Response = Response<ResBody>>,
  S::Future: Send + 'static,
{
  type Response = S::Response;
  type Error = S::Error;
  type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

  fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.inner.poll_ready(cx)
  }

  fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
    let client_ip = req
      .client_ip()
      .filter(|client_ip| !client_ip.is_empty())
      .map_or("unknown".to_string(), ToString::to_string);
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let version = req.version();
    let user_agent =
      req.headers().get(USER_AGENT).and_then(|h| h.to_str().ok()).unwrap_or("-").to_string();
    let referer =
      req.headers().get(REFERER).and_then(|h| h.to_str().ok()).unwrap_or("-").to_string();

    let future = self.inner.call(req);
    Box::pin(async move {
      let response = future.await?;
      let status = response.status().as_u16();

      info!(
        target: "reqip::access",
        client_ip = %client_ip,
        method = %method,
        uri = %uri,
        status,
        referer = %referer,
        user_agent = %user_agent,
        r#"{client_ip} "{method} {uri} {version:?}" {status}"#
      );

      Ok(response)
    })
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLogLayer;

impl<S> Layer<S> for AccessLogLayer {
  type Service = AccessLog<S>;

  fn layer(&self, inner: S) -> Self::Service {
    AccessLog::new(inner)
  }
}
