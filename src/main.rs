mod cli;

use clap::Parser;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::cli::Cli;
use crate::cli::Executable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_max_level(cli.verbosity().tracing_level_filter())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  cli.execute().await
}
