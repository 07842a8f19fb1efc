//! TenantGuard demo server.
//!
//! Serves `GET|POST /api/tenant/{tenantId}/secured` behind the TenantGuard
//! pipeline, plus an unguarded `GET /health`.
//!
//! # Usage
//!
//! ```text
//! DEMO_API_KEY=demoApiKey DEMO_HMAC_KEY=secret tenantguard-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4600` | Bind address |
//! | `DEMO_BEARER_TOKEN` | *(unset)* | Static bearer token for the demo admin |
//! | `DEMO_API_KEY` | *(unset)* | Static service API key |
//! | `DEMO_HMAC_KEY` | *(unset)* | Shared secret for signed requests |
//! | `HMAC_TENANTS` | `1` | Tenants provisioned for the HMAC secret |
//! | `HMAC_ALLOWED_SKEW_MS` | `30000` | Allowed clock skew |
//! | `NONCE_TTL_MS` | `300000` | Nonce retention |
//! | `JWKS_URL` | *(unset)* | Key set for JWT bearer tokens |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tenantguard_auth::{JwksVerifier, MemoryNonceStore, PrincipalResolver};
use tenantguard_core::GuardConfig;
use tenantguard_http::{Guard, GuardHttpConfig, GuardHttpService};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::{SecuredHandler, secured_criteria};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the guarded service and the nonce store it shares with the purge
/// task.
fn build_service(
    config: GuardConfig,
) -> Result<(GuardHttpService<SecuredHandler>, Arc<MemoryNonceStore>)> {
    let config = Arc::new(config);
    let nonce_store = Arc::new(MemoryNonceStore::new(config.replay_window_ms()));

    let mut resolver = PrincipalResolver::new(Arc::clone(&config), nonce_store.clone());
    if let Some(jwt) = &config.jwt {
        let verifier = JwksVerifier::new(jwt).context("failed to build JWKS verifier")?;
        info!(jwks_url = %jwt.jwks_url, "JWT bearer tokens enabled");
        resolver = resolver.with_jwt_verifier(Arc::new(verifier));
    }

    let service = GuardHttpService::new(
        Arc::new(SecuredHandler),
        Guard::new(resolver),
        GuardHttpConfig {
            criteria: secured_criteria(),
            ..GuardHttpConfig::default()
        },
    );

    Ok((service, nonce_store))
}

/// Purge expired nonces every half TTL until the task is aborted.
fn spawn_nonce_purger(store: Arc<MemoryNonceStore>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_millis((store.ttl_ms() / 2).max(1).unsigned_abs());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = store.purge_expired();
            debug!(removed, remaining = store.len(), "nonce purge tick");
        }
    })
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GuardHttpService<SecuredHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Probe `/health` on a running server.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GuardConfig::from_env();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let listen_addr = config.gateway_listen.clone();
    info!(
        bearer_tokens = config.static_users.len(),
        api_keys = config.service_keys.len(),
        hmac = config.hmac.is_some(),
        jwt = config.jwt.is_some(),
        allowed_skew_ms = config.allowed_skew_ms,
        nonce_ttl_ms = config.nonce_ttl_ms,
        "loaded configuration",
    );

    let (service, nonce_store) = build_service(config)?;
    let purger = spawn_nonce_purger(nonce_store);

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting TenantGuard server");

    let result = serve(listener, service).await;
    purger.abort();
    result
}
