pub mod serve;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use clap_verbosity_flag::InfoLevel;
use clap_verbosity_flag::Verbosity;
use reqip::config::ResolverConfig;
use reqip::error::ConfigError;
use reqip::resolver::RemoteAddrPolicy;
use tracing::debug;

use crate::cli::serve::Serve;

pub trait Executable {
  async fn execute(self) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, clap::Parser)]
#[command(version, about, author)]
pub struct Cli {
  #[arg(short, long, env = "REQIP_ADDRESS", default_value_t = Ipv4Addr::LOCALHOST.to_string())]
  address: String,
  #[arg(short, long, env = "REQIP_PORT", default_value_t = 8080)]
  port: u16,
  #[arg(
    short,
    long,
    env = "REQIP_CONFIG",
    help = "Resolver configuration file",
    value_name = "FILE",
    value_parser = parse_config,
  )]
  config: Option<ResolverConfig>,
  #[arg(long, env = "REQIP_STRIP_REMOTE_PORT", help = "Accept the peer address when it carries a port")]
  strip_remote_port: bool,
  #[command(flatten)]
  verbosity: Verbosity<InfoLevel>,
}

impl Cli {
  pub(crate) fn verbosity(&self) -> Verbosity<InfoLevel> {
    self.verbosity
  }

  fn resolver_config(&self) -> ResolverConfig {
    let mut config = self.config.clone().unwrap_or_default();
    if self.strip_remote_port {
      config.set_remote_addr(RemoteAddrPolicy::StripPort);
    }
    config
  }
}

impl Executable for Cli {
  async fn execute(self) -> anyhow::Result<()> {
    let resolver = self.resolver_config().into_resolver()?;
    debug!(
      headers = resolver.sources().len(),
      remote_addr = ?resolver.remote_addr_policy(),
      "client ip resolver configured"
    );

    Serve::new(self.address, self.port, Arc::new(resolver)).execute().await
  }
}

fn parse_config(arg: &str) -> Result<ResolverConfig, ConfigError> {
  ResolverConfig::from_file(PathBuf::from(arg))
}
