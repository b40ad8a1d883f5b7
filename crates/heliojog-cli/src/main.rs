//! # heliojog
//!
//! Jog a heliostat drive by hand from the terminal.
//!
//! ```bash
//! # Real controller on the default port
//! heliojog
//!
//! # No hardware: talk to the built-in simulator
//! heliojog --simulate
//!
//! # Headless: keys piped on stdin, e.g. two steps up then quit
//! printf '\033[A\033[Aq' | heliojog --simulate
//! ```
//!
//! Keys: Up/Down change speed, Tab starts the motor, Enter or Space stops it,
//! `q` quits. The motor is always stopped on exit.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use heliojog_core::prelude::*;
use heliojog_core::protocol::list_ports;
use std::fs::File;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::{RawModeGuard, ScreenRenderer, TerminalInput};

#[derive(Parser, Debug)]
#[command(name = "heliojog")]
#[command(about = "Manual jog control for a heliostat motor controller", long_about = None)]
#[command(version)]
struct Cli {
    /// Use the built-in controller simulator instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// Serial port of the controller
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Speed step and bounds
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Motor channel to drive
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    channel: Option<u8>,

    /// Wait for a query response, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Wait for a key before polling telemetry, in milliseconds
    #[arg(long)]
    input_wait_ms: Option<u64>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write logs here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    /// ±100 over [-2048, 2048]
    Fine,
    /// ±5 over [-100, 100]
    Coarse,
}

impl From<ProfileArg> for SpeedProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fine => SpeedProfile::FINE,
            ProfileArg::Coarse => SpeedProfile::COARSE,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    if cli.list_ports {
        for port in list_ports() {
            match port.product {
                Some(product) => println!("{}\t{}", port.name, product),
                None => println!("{}", port.name),
            }
        }
        return Ok(());
    }

    let config = effective_config(&cli)?;

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => JogConfig::default_path().context("locating config directory")?,
        };
        config
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let transport: Box<dyn DeviceTransport> = if cli.simulate {
        tracing::info!("using simulated controller");
        Box::new(SimulatedDevice::new())
    } else {
        let conn = &config.connection;
        Box::new(
            LineTransport::open_serial(&conn.port, conn.baud_rate)
                .with_context(|| format!("opening controller on {}", conn.port))?,
        )
    };

    let mut client = MotorClient::new(transport, config.drive.profile)
        .with_channel(config.drive.channel)
        .with_response_timeout(config.response_timeout());

    let mut renderer = ScreenRenderer::new(io::stdout());
    if io::stdin().is_terminal() {
        // Dropped after run_session, so the motor is stopped before the
        // terminal is restored
        let _raw = RawModeGuard::enable().context("entering raw terminal mode")?;
        run_session(&mut client, &mut TerminalInput, &mut renderer, config.input_wait())
            .context("jog session failed")?;
    } else {
        let mut keys = Vec::new();
        io::stdin()
            .read_to_end(&mut keys)
            .context("reading keys from stdin")?;
        let mut input = ScriptedInput::from_bytes(&keys).context("decoding keys from stdin")?;
        run_session(&mut client, &mut input, &mut renderer, config.input_wait())
            .context("jog session failed")?;
    }

    Ok(())
}

/// Config file values with command line overrides applied
fn effective_config(cli: &Cli) -> Result<JogConfig> {
    let mut config =
        JogConfig::load_or_default(cli.config.as_deref()).context("loading configuration")?;

    if let Some(port) = &cli.port {
        config.connection.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.connection.baud_rate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.connection.response_timeout_ms = timeout_ms;
    }
    if let Some(profile) = cli.profile {
        config.drive.profile = profile.into();
    }
    if let Some(channel) = cli.channel {
        config.drive.channel = Channel::try_from(channel)
            .map_err(|n| anyhow::anyhow!("no motor channel {}", n))?;
    }
    if let Some(wait) = cli.input_wait_ms {
        config.input_wait_ms = wait;
    }

    config.validate().context("invalid settings")?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("heliojog=warn,heliojog_core=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file_config = JogConfig::default();
        file_config.connection.port = "/dev/ttyUSB3".to_string();
        file_config.connection.baud_rate = 9600;
        file_config.save(&path).unwrap();

        let cli = Cli::parse_from([
            "heliojog",
            "--config",
            path.to_str().unwrap(),
            "--baud",
            "57600",
            "--profile",
            "coarse",
            "--channel",
            "2",
        ]);
        let config = effective_config(&cli).unwrap();

        assert_eq!(config.connection.port, "/dev/ttyUSB3");
        assert_eq!(config.connection.baud_rate, 57600);
        assert_eq!(config.drive.profile, SpeedProfile::COARSE);
        assert_eq!(config.drive.channel, Channel::Two);
    }

    #[test]
    fn test_channel_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["heliojog", "--channel", "3"]).is_err());
    }
}
