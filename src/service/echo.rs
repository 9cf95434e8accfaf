use std::convert::Infallible;
use std::future::Ready;
use std::future::ready;
use std::task::Context;
use std::task::Poll;

use bytes::Bytes;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use tower::Service;

use crate::util::request_ext::RequestExt;
use crate::util::response_ext::ResponseExt;

/// Answers every request with the resolved client IP as plain text.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoService;

impl<B> Service<Request<B>> for EchoService {
  type Response = Response<Full<Bytes>>;
  type Error = Infallible;
  type Future = Ready<Result<Self::Response, Self::Error>>;

  fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
    Poll::Ready(Ok(()))
  }

  fn call(&mut self, req: Request<B>) -> Self::Future {
    let body = match req.client_ip() {
      Some(client_ip) if !client_ip.is_empty() => format!("{client_ip}\n"),
      _ => String::new(),
    };
    ready(Ok(Response::plain_text(body)))
  }
}
