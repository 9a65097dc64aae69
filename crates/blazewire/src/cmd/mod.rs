use std::path::PathBuf;
use std::time::Duration;

use blazewire_client::{Client, ClientConfig, Watcher};
use blazewire_store::{BufferStore, DirStore, MemoryStore};
use blazewire_transport::WsTransport;
use clap::{Args, Subcommand};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod patterns;
pub mod ping;
pub mod preview;
pub mod settings;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Measure round trip time to a controller.
    Ping(PingArgs),
    /// List the patterns stored on a controller.
    Patterns(PatternsArgs),
    /// Show controller settings and the active pattern.
    Settings(SettingsArgs),
    /// Fetch the preview image of a pattern.
    Preview(PreviewArgs),
    /// Print statistics and pattern changes as the controller pushes them.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format),
        Command::Patterns(args) => patterns::run(args, format),
        Command::Settings(args) => settings::run(args, format),
        Command::Preview(args) => preview::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Controller address: host, host:port or ws:// URL.
    pub address: String,
    /// Reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Stage binary replies as files under DIR instead of in memory.
    #[arg(long, value_name = "DIR", env = "BLAZEWIRE_BUFFER_DIR")]
    pub buffer_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Number of pings to send.
    #[arg(long, short = 'n', default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct PatternsArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Sort by name instead of controller order.
    #[arg(long)]
    pub sort: bool,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Pattern id.
    pub pattern_id: String,
    /// Write the JPEG here. Without it, raw format writes to stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub type Session<W> = Client<WsTransport, Box<dyn BufferStore>, W>;

/// Connect and build a client whose requests expire after `timeout`.
pub fn open_session<W: Watcher>(
    args: &ConnectArgs,
    watcher: W,
    timeout: Duration,
) -> CliResult<Session<W>> {
    let transport =
        WsTransport::connect(&args.address).map_err(|err| transport_error("connect failed", err))?;
    let store: Box<dyn BufferStore> = match &args.buffer_dir {
        Some(dir) => Box::new(DirStore::collect_all(dir)),
        None => Box::new(MemoryStore::default()),
    };
    let config = ClientConfig {
        max_response_wait: timeout,
        ..ClientConfig::default()
    };
    Ok(Client::with_config(transport, store, watcher, config))
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_seconds() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_timeout_millis() {
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_timeout_invalid() {
        assert_eq!(parse_timeout("0s").unwrap_err().code, USAGE);
        assert!(parse_timeout("bad").is_err());
        assert!(parse_timeout("").is_err());
    }
}
