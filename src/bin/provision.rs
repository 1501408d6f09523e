//! `zkpass-provision`: write a citizen identity onto a ZK-Pass device.
//!
//! ```bash
//! zkpass-provision                 # auto-detect the device
//! zkpass-provision --port COM3     # or name it
//! ```

use chrono::Datelike;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use zkpass_bridge::config::{Config, ConfigLoader};
use zkpass_bridge::console::{Console, PortChoice, RULE};
use zkpass_bridge::device::{DeviceLink, ExchangeTimings, LinkSettings, PortSource};
use zkpass_bridge::locator::PortLocator;
use zkpass_bridge::logging::init_logging;
use zkpass_bridge::port::SerialConnector;
use zkpass_bridge::service::{DeviceService, ProvisionOutcome};

#[derive(Parser, Debug)]
#[command(version, about = "Secure citizen identity provisioning for ZK-Pass devices.")]
struct Args {
    /// Serial port of the device; auto-detected when omitted.
    #[arg(short, long)]
    port: Option<String>,

    /// Configuration file (overrides the standard search path).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match ConfigLoader::load_with(args.config.as_deref()) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!(" Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging, args.verbose) {
        eprintln!("Warning: logging unavailable: {e}");
    }

    let mut console = Console::stdio();
    match run(&args, &config, &mut console).await {
        Ok(code) => code,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            println!("\n\n Operation cancelled by user.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(" Unexpected error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run<R: BufRead, W: Write>(
    args: &Args,
    config: &Config,
    console: &mut Console<R, W>,
) -> io::Result<ExitCode> {
    console.say(RULE)?;
    console.say(" ZK-Pass Identity Config Tool")?;
    console.say("   Secure Citizen Identity Provisioning")?;
    console.say(RULE)?;

    let Some(port) = resolve_port(args, config, console)? else {
        return Ok(ExitCode::FAILURE);
    };

    let service = DeviceService::new(
        DeviceLink::new(
            PortSource::Fixed(port.clone()),
            Arc::new(SerialConnector),
            LinkSettings::from(&config.device),
        ),
        ExchangeTimings::from(&config.device),
    );

    console.say(format!(" Connecting to device on {port}..."))?;
    if let Err(e) = service.connect().await {
        console.say(format!(" Failed to connect to {port}: {e}"))?;
        return Ok(ExitCode::FAILURE);
    }
    console.say(" Device communication established.")?;

    let result = provision(&service, console).await;
    service.close().await;
    console.say("\n Serial connection closed.")?;
    result
}

/// Flag, then config or environment, then auto-detection, then the operator.
fn resolve_port<R: BufRead, W: Write>(
    args: &Args,
    config: &Config,
    console: &mut Console<R, W>,
) -> io::Result<Option<String>> {
    if let Some(port) = &args.port {
        return Ok(Some(port.clone()));
    }

    match config.device.port_source() {
        PortSource::Fixed(port) => return Ok(Some(port)),
        PortSource::AutoDetect(locator) => {
            console.say("\n Searching for ZK-Pass device...")?;
            if let Some(port) = locator.locate() {
                return Ok(Some(port));
            }
        }
    }

    match console.choose_port(&PortLocator::available())? {
        PortChoice::Manual(port) => Ok(Some(port)),
        PortChoice::Empty => {
            console.say(" No port specified. Exiting.")?;
            Ok(None)
        }
        PortChoice::Declined => {
            console.say(" Device selection cancelled.")?;
            Ok(None)
        }
    }
}

async fn provision<R: BufRead, W: Write>(
    service: &DeviceService,
    console: &mut Console<R, W>,
) -> io::Result<ExitCode> {
    let identity = console.collect_identity(chrono::Local::now().year())?;
    if !console.confirm(&identity)? {
        console.say(" Operation cancelled by user.")?;
        return Ok(ExitCode::SUCCESS);
    }

    console.say("\n Programming device with citizen identity...")?;
    match service.provisioning().provision(&identity).await {
        Ok(ProvisionOutcome::Provisioned { self_test }) => {
            console.say(format!(" Age verification self-test: {self_test}"))?;
            console.say("")?;
            console.say(RULE)?;
            console.say(" Device provisioning completed successfully!")?;
            console.say("Please deliver the device to the citizen.")?;
            console.say(format!("Device PIN: {}", identity.pin().as_str()))?;
            console.say("Citizen should keep PIN secure and confidential.")?;
            console.say(RULE)?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(ProvisionOutcome::Rejected { response }) => {
            console.say(format!(" Device provisioning failed (device said: {response})."))?;
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            console.say(format!(" Device provisioning failed: {e}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}
