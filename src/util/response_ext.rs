use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use hyper::header::CONTENT_TYPE;
use hyper::header::HeaderValue;

pub(crate) trait ResponseExt {
  fn plain_text(body: impl Into<Bytes>) -> Self;
}

impl ResponseExt for Response<Full<Bytes>> {
  fn plain_text(body: impl Into<Bytes>) -> Self {
    let mut response = Response::new(Full::new(body.into()));
    response
      .headers_mut()
      .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
  }
}
