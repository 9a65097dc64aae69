use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives that override `--log-level`.
pub const LOG_ENV: &str = "BLAZEWIRE_LOG";

const CRATES: [&str; 5] = [
    "blazewire",
    "blazewire_client",
    "blazewire_transport",
    "blazewire_frame",
    "blazewire_store",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `level` for the blazewire crates, `warn` for everything else.
fn directives(level: LogLevel) -> String {
    let mut out = String::from("warn");
    for name in CRATES {
        out.push(',');
        out.push_str(name);
        out.push('=');
        out.push_str(level.as_str());
    }
    out
}

/// Install the stderr subscriber. Protocol anomalies from the client show
/// up at `warn`, per-message routing at `debug`.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(directives(level)));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_applies_to_blazewire_crates_only() {
        let d = directives(LogLevel::Debug);
        assert!(d.starts_with("warn,"));
        assert!(d.contains("blazewire_client=debug"));
        assert!(d.contains("blazewire_store=debug"));
        assert!(EnvFilter::try_new(&d).is_ok());
    }
}
