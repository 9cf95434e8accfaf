use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use hyper::header::HeaderName;
use serde::Deserialize;
use serde::Deserializer;

use crate::error::ConfigError;
use crate::resolver::ClientIpResolver;
use crate::resolver::Extractor;
use crate::resolver::RemoteAddrPolicy;
use crate::resolver::Source;

/// Resolver settings as read from a TOML file.
///
/// Leaving out `headers` keeps the default lookup order, an empty list
/// consults the remote address only.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
  #[serde(default)]
  headers: Option<Vec<HeaderConfig>>,
  #[serde(default)]
  remote_addr: RemoteAddrPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderConfig {
  #[serde(deserialize_with = "deserialize_header_name")]
  name: HeaderName,
  #[serde(default)]
  extractor: Extractor,
}

impl ResolverConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  pub fn remote_addr(&self) -> RemoteAddrPolicy {
    self.remote_addr
  }

  pub fn set_remote_addr(&mut self, policy: RemoteAddrPolicy) {
    self.remote_addr = policy;
  }

  pub fn into_resolver(self) -> Result<ClientIpResolver, ConfigError> {
    let resolver = match self.headers {
      None => ClientIpResolver::default(),
      Some(headers) => {
        let mut seen = HashSet::new();
        let sources = headers
          .into_iter()
          .map(|header| {
            if !seen.insert(header.name.clone()) {
              return Err(ConfigError::DuplicateHeader(header.name));
            }
            Ok(Source::new(header.name, header.extractor))
          })
          .collect::<Result<Vec<_>, _>>()?;
        ClientIpResolver::new(sources)
      }
    };

    Ok(resolver.with_remote_addr_policy(self.remote_addr))
  }
}

impl FromStr for ResolverConfig {
  type Err = toml::de::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    toml::from_str(s)
  }
}

fn deserialize_header_name<'de, D>(deserializer: D) -> Result<HeaderName, D::Error>
where
  D: Deserializer<'de>,
{
  HeaderName::from_str(&String::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
  use hyper::HeaderMap;
  use hyper::header::HeaderValue;
  use rstest::rstest;

  use crate::config::ResolverConfig;
  use crate::error::ConfigError;
  use crate::resolver::DEFAULT_SOURCES;
  use crate::resolver::Extractor;
  use crate::resolver::RemoteAddrPolicy;

  #[test]
  fn test_from_file() {
    let config = ResolverConfig::from_file("tests/fixtures/reqip.toml").unwrap();
    assert_eq!(config.remote_addr(), RemoteAddrPolicy::StripPort);

    let resolver = config.into_resolver().unwrap();
    let names = resolver.sources().iter().map(|source| source.name().as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"]);
    assert!(matches!(resolver.sources()[1].extractor(), Extractor::ForwardedFor));
    assert!(matches!(resolver.sources()[2].extractor(), Extractor::Single));
  }

  #[test]
  fn test_from_file_not_found() {
    let error = ResolverConfig::from_file("tests/fixtures/missing.toml").unwrap_err();
    assert!(matches!(error, ConfigError::Read { .. }));
    assert!(error.to_string().ends_with("tests/fixtures/missing.toml"));
  }

  #[test]
  fn test_from_file_invalid() {
    let error = ResolverConfig::from_file("tests/fixtures/invalid.toml").unwrap_err();
    assert!(matches!(error, ConfigError::Parse { .. }));
  }

  #[test]
  fn test_empty_document_uses_defaults() {
    let resolver = "".parse::<ResolverConfig>().unwrap().into_resolver().unwrap();
    assert_eq!(resolver.sources().len(), DEFAULT_SOURCES.len());
    assert_eq!(resolver.remote_addr_policy(), RemoteAddrPolicy::Raw);
  }

  #[test]
  fn test_empty_header_list_uses_remote_addr_only() {
    let config = "headers = []\nremote_addr = \"strip-port\"".parse::<ResolverConfig>().unwrap();
    let resolver = config.into_resolver().unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-client-ip", HeaderValue::from_static("192.0.2.1"));
    assert_eq!(resolver.resolve(&headers, "198.51.100.7:54321"), "198.51.100.7");
  }

  #[test]
  fn test_header_names_are_normalized() {
    let config = "[[headers]]\nname = \"X-Real-IP\"".parse::<ResolverConfig>().unwrap();
    let resolver = config.into_resolver().unwrap();
    assert_eq!(resolver.sources()[0].name().as_str(), "x-real-ip");
  }

  #[test]
  fn test_duplicate_header() {
    let config = "[[headers]]\nname = \"x-real-ip\"\n[[headers]]\nname = \"X-Real-IP\""
      .parse::<ResolverConfig>()
      .unwrap();
    let error = config.into_resolver().unwrap_err();
    assert!(matches!(error, ConfigError::DuplicateHeader(name) if name == "x-real-ip"));
  }

  #[rstest]
  #[case::bad_header_name("[[headers]]\nname = \"x real ip\"")]
  #[case::unknown_extractor("[[headers]]\nname = \"x-real-ip\"\nextractor = \"last-hop\"")]
  #[case::custom_extractor("[[headers]]\nname = \"x-real-ip\"\nextractor = \"custom\"")]
  #[case::unknown_policy("remote_addr = \"trust\"")]
  #[case::unknown_key("trusted_proxies = []")]
  fn test_rejected_documents(#[case] document: &str) {
    assert!(document.parse::<ResolverConfig>().is_err());
  }

  #[test]
  fn test_set_remote_addr() {
    let mut config = ResolverConfig::default();
    config.set_remote_addr(RemoteAddrPolicy::StripPort);
    assert_eq!(config.into_resolver().unwrap().remote_addr_policy(), RemoteAddrPolicy::StripPort);
  }
}
