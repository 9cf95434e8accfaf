use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::SERVER;
use hyper::http::HeaderValue;
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use reqip::ClientIpResolver;
use reqip::PeerAddr;
use reqip::service::AccessLogLayer;
use reqip::service::ClientIpLayer;
use reqip::service::EchoService;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::signal::unix::Signal;
use tokio::signal::unix::SignalKind;
use tower::ServiceBuilder;
use tower_http::ServiceBuilderExt;
use tower_http::request_id::MakeRequestUuid;
use tower_http::trace::TraceLayer;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::cli::Executable;

const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct Serve {
  address: String,
  port: u16,
  resolver: Arc<ClientIpResolver>,
}

impl Serve {
  pub fn new(address: String, port: u16, resolver: Arc<ClientIpResolver>) -> Self {
    Self { address, port, resolver }
  }

  async fn serve(self) -> anyhow::Result<()> {
    let listener = TcpListener::bind((self.address.as_str(), self.port)).await?;
    info!("reqip running on [http://{}]", listener.local_addr()?);

    let http = Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let shutdown = shutdown_signal(tokio::signal::unix::signal(SignalKind::terminate())?);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
      tokio::select! {
        accepted = listener.accept() => match accepted {
          Ok((stream, peer_addr)) => self.spawn_connection(&http, &graceful, stream, peer_addr),
          Err(err) => warn!("Failed to accept connection: {err}"),
        },
        () = &mut shutdown => break,
      }
    }

    drop(listener);
    info!("Starting graceful shutdown");
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, graceful.shutdown()).await {
      Ok(()) => info!("Gracefully shutdown"),
      Err(_) => info!("Time out while waiting for graceful shutdown, aborting"),
    }
    Ok(())
  }

  fn spawn_connection(
    &self,
    http: &Builder<TokioExecutor>,
    graceful: &GracefulShutdown,
    stream: TcpStream,
    peer_addr: SocketAddr,
  ) {
    let service = ServiceBuilder::new()
      .add_extension(PeerAddr(peer_addr))
      .set_x_request_id(MakeRequestUuid)
      .layer(TraceLayer::new_for_http().on_request(()))
      .propagate_x_request_id()
      .insert_response_header_if_not_present(SERVER, HeaderValue::from_static(SERVER_NAME))
      .layer(ClientIpLayer::new(self.resolver.clone()))
      .layer(AccessLogLayer)
      .service(EchoService);

    let connection =
      http.serve_connection_with_upgrades(TokioIo::new(stream), TowerToHyperService::new(service));
    let future = graceful.watch(connection.into_owned());
    tokio::spawn(async move {
      if let Err(err) = future.await {
        log_connection_error(peer_addr, err.as_ref());
      }
    });
  }
}

impl Executable for Serve {
  async fn execute(self) -> anyhow::Result<()> {
    self.serve().await
  }
}

async fn shutdown_signal(mut sigterm: Signal) {
  tokio::select! {
    _ = tokio::signal::ctrl_c() => {},
    _ = sigterm.recv() => {},
  }
}

fn log_connection_error(peer_addr: SocketAddr, err: &(dyn Error + Send + Sync + 'static)) {
  // Clients dropping mid-request are routine.
  match err.downcast_ref::<hyper::Error>() {
    Some(hyper_error) if hyper_error.is_incomplete_message() => {
      debug!(%peer_addr, "Error serving connection: {err}");
    }
    _ => error!(%peer_addr, "Error serving connection: {err}"),
  }
}
