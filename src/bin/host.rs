use anyhow::{bail, Context};
use clap::Parser;
use paneport::api::{create_api_server, AppState};
use paneport::config::EngineConfig;
use paneport::host::HostContext;
use paneport::logging::{init_logging, LogFormat};
use paneport::metrics::{install_exporter, MetricsConfig};
use paneport::remote::{LoopbackRemote, RemoteRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "paneport-host", about = "File manager engine host", version)]
struct Args {
    /// Address for the HTTP and WebSocket server
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve a local directory as a remote host, as HOST=DIR (repeatable)
    #[arg(long = "loopback", value_name = "HOST=DIR")]
    loopback: Vec<String>,

    /// Prometheus listener address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Shared bandwidth cap in bytes per second
    #[arg(long)]
    max_bytes_per_second: Option<u64>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn parse_loopback(arg: &str) -> anyhow::Result<(String, PathBuf)> {
    let Some((host, dir)) = arg.split_once('=') else {
        bail!("expected HOST=DIR, got '{arg}'");
    };
    if host.is_empty() || dir.is_empty() {
        bail!("expected HOST=DIR, got '{arg}'");
    }
    Ok((host.to_string(), PathBuf::from(dir)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_logging(args.verbose.saturating_add(1), format)?;

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(addr) = args.metrics_addr {
        config.server.metrics_addr = Some(addr);
    }
    if let Some(limit) = args.max_bytes_per_second {
        config.transfer.max_bytes_per_second = limit;
    }
    config.validate()?;

    let metrics_config = MetricsConfig {
        listen_addr: config.server.metrics_addr,
    };
    install_exporter(&metrics_config).context("failed to install metrics exporter")?;
    if let Some(addr) = metrics_config.listen_addr {
        tracing::info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let remotes = RemoteRegistry::new();
    for arg in &args.loopback {
        let (host, dir) = parse_loopback(arg)?;
        if !dir.is_dir() {
            bail!("loopback root '{}' is not a directory", dir.display());
        }
        tracing::info!("Registered loopback host '{}' at {}", host, dir.display());
        remotes.register(Arc::new(LoopbackRemote::new(host, &dir)));
    }

    let bind_addr = config.server.bind_addr;
    let ctx = HostContext::new(config, remotes);
    let app = create_api_server(AppState::new(ctx)?);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("Host listening on http://{}", bind_addr);
    tracing::info!("WebSocket channel at ws://{}/ws", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loopback() {
        let (host, dir) = parse_loopback("lab=/srv/data").unwrap();
        assert_eq!(host, "lab");
        assert_eq!(dir, PathBuf::from("/srv/data"));

        assert!(parse_loopback("nodir").is_err());
        assert!(parse_loopback("=/srv").is_err());
    }
}
