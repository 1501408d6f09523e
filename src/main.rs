//! `zkpass-bridge`: HTTP age-verification service in front of one device.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use zkpass_bridge::config::{Config, ConfigLoader, LogFormat};
use zkpass_bridge::device::{DeviceLink, ExchangeTimings, LinkSettings};
use zkpass_bridge::logging::init_logging;
use zkpass_bridge::port::SerialConnector;
use zkpass_bridge::rest_api::{build_router, RestContext};
use zkpass_bridge::service::DeviceService;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Answers browser age checks by asking a ZK-Pass device over serial.",
    long_about = "Serves POST /verify-age and forwards each request as a CHK_AGE command to the \
                  attached device, one exchange at a time. The device port comes from --device, \
                  the config file, ZKPASS_DEVICE_PORT / ESP32_PORT, or auto-detection."
)]
struct Args {
    /// Configuration file (overrides the standard search path).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the device, e.g. /dev/ttyUSB0 or COM3.
    #[arg(short, long)]
    device: Option<String>,

    /// Address to bind the HTTP server to.
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP server.
    #[arg(short, long)]
    port: Option<u16>,

    /// Log output format: pretty, compact or json.
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Debug logging for this crate.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line flags win over file and environment.
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.device.port = Some(device.clone());
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = ConfigLoader::load_with(args.config.as_deref())?.into_config();
    args.apply(&mut config);
    init_logging(&config.logging, args.verbose)?;

    let link = DeviceLink::new(
        config.device.port_source(),
        Arc::new(SerialConnector),
        LinkSettings::from(&config.device),
    );

    // Without any port identifier no request could ever succeed.
    let port = match link.resolve_port() {
        Ok(port) => port,
        Err(e) => {
            error!(error = %e, "no device port configured or detected; set --device or ZKPASS_DEVICE_PORT");
            return Err(e.into());
        }
    };
    info!(port = %port, "device port resolved");

    let service = DeviceService::new(link, ExchangeTimings::from(&config.device));
    if let Err(e) = service.connect().await {
        warn!(error = %e, "device not reachable yet; will retry on each request");
    }

    let app = build_router(RestContext {
        service: service.clone(),
        allowed_origin_prefix: config.server.allowed_origin_prefix.clone(),
    });

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "zkpass-bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
