use std::time::Duration;

use clap::{Args, Subcommand};
use ctrlwire_client::{connect_with_config, ClientConfig, CtrlClient};
use ctrlwire_transport::TcpSession;

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod get;
pub mod set;
pub mod version;
pub mod watch;

/// Conventional control interface port.
pub const DEFAULT_PORT: u16 = 4259;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a variable.
    Get(GetArgs),
    /// Write a variable.
    Set(SetArgs),
    /// Print TRAP notifications as they arrive.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Get(args) => get::run(args, format),
        Command::Set(args) => set::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Control interface host.
    #[arg(long, default_value = "127.0.0.1", env = "CTRLWIRE_HOST")]
    pub host: String,
    /// Control interface port.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "CTRLWIRE_PORT")]
    pub port: u16,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

impl ConnectArgs {
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_config(&self, reply_timeout: Option<Duration>) -> CliResult<ClientConfig> {
        Ok(ClientConfig {
            connect_timeout: parse_duration(&self.connect_timeout)?,
            reply_timeout,
            ..ClientConfig::default()
        })
    }

    pub fn connect(&self, config: &ClientConfig) -> CliResult<CtrlClient<TcpSession>> {
        connect_with_config(&self.host, self.port, config)
            .map_err(|err| client_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// Reply timeout (e.g. 10s, 500ms, or `none` to wait indefinitely).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
}

impl ReplyArgs {
    pub fn reply_timeout(&self) -> CliResult<Option<Duration>> {
        parse_optional_duration(&self.timeout)
    }
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub conn: ConnectArgs,
    #[command(flatten)]
    pub reply: ReplyArgs,
    /// Variable to read, e.g. `subscriber.by-imsi-001010000000001.msisdn`.
    pub variable: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub conn: ConnectArgs,
    #[command(flatten)]
    pub reply: ReplyArgs,
    /// Variable to write.
    pub variable: String,
    /// Value to write.
    pub value: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub conn: ConnectArgs,
    /// Exit after receiving N notifications.
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop watching after this long (e.g. 30s).
    #[arg(long)]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
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
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Like [`parse_duration`], but `none` means no limit.
pub fn parse_optional_duration(input: &str) -> CliResult<Option<Duration>> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_duration(input).map(Some)
}
