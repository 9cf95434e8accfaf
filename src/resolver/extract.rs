use std::borrow::Cow;
use std::net::IpAddr;
use std::str::FromStr;

use hyper::HeaderMap;
use hyper::header::HeaderName;
use serde::Deserialize;

/// Returns `true` when `candidate` is an IPv4 or IPv6 address literal.
pub fn is_ip(candidate: &str) -> bool {
  IpAddr::from_str(candidate).is_ok()
}

/// Picks the left-most valid address out of an `X-Forwarded-For` value.
///
/// Hops are separated by `", "`. A hop containing a colon is cut at the first
/// colon to drop an IPv4 port, which also truncates any IPv6 hop, so those
/// never match. Hops such as `unknown` fail [`is_ip`] and are skipped.
pub fn from_forwarded_for(value: &str) -> Option<&str> {
  value
    .split(", ")
    .map(|hop| hop.split_once(':').map_or(hop, |(address, _port)| address))
    .find(|address| is_ip(address))
}

/// How a header value is turned into a client IP candidate.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Extractor {
  /// The whole value must be an address.
  #[default]
  Single,
  /// Multi-hop `X-Forwarded-For` list, see [`from_forwarded_for`].
  ForwardedFor,
  #[serde(skip)]
  Custom(fn(&str) -> Option<&str>),
}

impl Extractor {
  pub fn extract<'a>(&self, value: &'a str) -> Option<&'a str> {
    match self {
      Extractor::Single => is_ip(value).then_some(value),
      Extractor::ForwardedFor => from_forwarded_for(value),
      Extractor::Custom(extract) => extract(value).filter(|address| is_ip(address)),
    }
  }
}

/// Reads `name` from `headers`, joining repeated header lines with `", "`.
///
/// Values that are not visible ASCII are ignored.
pub(crate) fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<Cow<'a, str>> {
  let mut values = headers.get_all(name).iter().filter_map(|value| value.to_str().ok());
  let first = values.next()?;

  match values.next() {
    None => Some(Cow::Borrowed(first)),
    Some(second) => {
      let mut joined = format!("{first}, {second}");
      for value in values {
        joined.push_str(", ");
        joined.push_str(value);
      }
      Some(Cow::Owned(joined))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::net::IpAddr;
  use std::str::FromStr;

  use hyper::HeaderMap;
  use hyper::header::HeaderName;
  use hyper::header::HeaderValue;
  use proptest::prelude::*;
  use rstest::rstest;

  use crate::resolver::extract::Extractor;
  use crate::resolver::extract::from_forwarded_for;
  use crate::resolver::extract::header_value;
  use crate::resolver::extract::is_ip;

  #[rstest]
  #[case("203.0.113.5", true)]
  #[case("::1", true)]
  #[case("2001:db8::1a2b:3c4d", true)]
  #[case("::ffff:192.0.2.128", true)]
  #[case("", false)]
  #[case("unknown", false)]
  #[case("203.0.113.5:443", false)]
  #[case("[::1]:80", false)]
  #[case("256.1.1.1", false)]
  #[case(" 203.0.113.5", false)]
  #[case("fe80::1%eth0", false)]
  fn test_is_ip(#[case] candidate: &str, #[case] expected: bool) {
    assert_eq!(is_ip(candidate), expected);
  }

  #[rstest]
  #[case::leftmost("203.0.113.5, 70.41.3.18, 150.172.238.178", Some("203.0.113.5"))]
  #[case::skips_unknown("unknown, 70.41.3.18", Some("70.41.3.18"))]
  #[case::strips_port("203.0.113.5:443", Some("203.0.113.5"))]
  #[case::strips_port_in_chain("unknown, 70.41.3.18:8080, 1.2.3.4", Some("70.41.3.18"))]
  #[case::empty("", None)]
  #[case::all_invalid("unknown, unknown", None)]
  #[case::comma_without_space("203.0.113.5,70.41.3.18", None)]
  #[case::ipv6_truncated("2001:db8::1", None)]
  #[case::ipv6_skipped("2001:db8::1, 70.41.3.18", Some("70.41.3.18"))]
  #[case::bracketed_ipv6_skipped("[2001:db8::1]:443, 1.2.3.4", Some("1.2.3.4"))]
  fn test_from_forwarded_for(#[case] value: &str, #[case] expected: Option<&str>) {
    assert_eq!(from_forwarded_for(value), expected);
  }

  #[test]
  fn test_custom_extractor_is_validated() {
    let last_hop = Extractor::Custom(|value| value.rsplit(", ").next());
    assert_eq!(last_hop.extract("203.0.113.5, 70.41.3.18"), Some("70.41.3.18"));
    assert_eq!(last_hop.extract("203.0.113.5, unknown"), None);
  }

  #[test]
  fn test_single_extractor() {
    assert_eq!(Extractor::Single.extract("198.51.100.7"), Some("198.51.100.7"));
    assert_eq!(Extractor::Single.extract("198.51.100.7, 10.0.0.1"), None);
  }

  #[test]
  fn test_header_value_joins_repeated_lines() {
    let name = HeaderName::from_static("x-forwarded-for");
    let mut headers = HeaderMap::new();
    assert_eq!(header_value(&headers, &name), None);

    headers.append(&name, HeaderValue::from_static("unknown"));
    assert_eq!(header_value(&headers, &name).as_deref(), Some("unknown"));

    headers.append(&name, HeaderValue::from_static("70.41.3.18"));
    headers.append(&name, HeaderValue::from_static("1.2.3.4"));
    assert_eq!(header_value(&headers, &name).as_deref(), Some("unknown, 70.41.3.18, 1.2.3.4"));
  }

  #[test]
  fn test_header_value_ignores_opaque_bytes() {
    let name = HeaderName::from_static("x-real-ip");
    let mut headers = HeaderMap::new();
    headers.append(&name, HeaderValue::from_bytes(b"\xff1.2.3.4").unwrap());
    assert_eq!(header_value(&headers, &name), None);
  }

  proptest! {
    #[test]
    fn test_accepted_ip_round_trips(candidate in "\\PC{0,40}") {
      if is_ip(&candidate) {
        let canonical = IpAddr::from_str(&candidate).unwrap().to_string();
        prop_assert!(is_ip(&canonical));
      }
    }

    #[test]
    fn test_ip_literal_is_accepted(ip: IpAddr) {
      prop_assert!(is_ip(&ip.to_string()));
    }

    #[test]
    fn test_forwarded_for_result_is_valid(value in "[0-9a-z.:, ]{0,64}") {
      if let Some(address) = from_forwarded_for(&value) {
        prop_assert!(is_ip(address));
        prop_assert!(!address.contains(':'));
      }
    }
  }
}
