use std::path::PathBuf;

use hyper::header::HeaderName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config file: {}", path.display())]
  Read { path: PathBuf, source: std::io::Error },
  #[error("Failed to parse config file: {}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },
  #[error("Header `{0}` is listed more than once")]
  DuplicateHeader(HeaderName),
}
