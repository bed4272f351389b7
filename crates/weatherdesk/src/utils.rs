use clap::{Parser, Subcommand};
use slog::{o, Drain, Level, Logger};
use std::{env, path::PathBuf};
use weatherdesk_core::{
    find_config_file, get_xdg_data_dir, load_config, ConfigSource, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_WINDOW_DAYS,
};

use crate::{ExportFormat, Units, DEFAULT_BASE_URL};

const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "weatherdesk - current conditions, alerts and local weather history"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WEATHERDESK_CONFIG, ./weatherdesk.toml,
    /// $XDG_CONFIG_HOME/weatherdesk/weatherdesk.toml, /etc/weatherdesk/weatherdesk.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WEATHERDESK_LEVEL")]
    pub level: Option<String>,

    /// OpenWeatherMap API key
    #[arg(short = 'k', long, env = "WEATHERDESK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Weather API base URL
    #[arg(short, long, env = "WEATHERDESK_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the history log, saved locations and backups
    #[arg(short, long, env = "WEATHERDESK_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Units for provider requests
    #[arg(short, long, value_enum, env = "WEATHERDESK_UNITS")]
    pub units: Option<Units>,

    /// Trailing history window in days used by history, trend and prune
    #[arg(short, long, env = "WEATHERDESK_WINDOW_DAYS")]
    pub window_days: Option<u32>,

    /// Seconds between refreshes in watch mode
    #[arg(short, long, env = "WEATHERDESK_REFRESH_INTERVAL")]
    pub refresh_interval: Option<u64>,

    /// Program used for desktop notifications, empty to print alerts instead
    #[arg(short, long, env = "WEATHERDESK_NOTIFY_COMMAND")]
    pub notify_command: Option<String>,

    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Fetch current conditions, raise alerts and record them
    Current { city: String },
    /// Show one forecast reading per day
    Forecast {
        city: String,
        /// Number of days to show
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show the air quality index for a city
    Air { city: String },
    /// Refresh a city on an interval until interrupted
    Watch { city: String },
    /// List recorded observations inside the window
    History {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Per-day temperature and wind summary
    Trend {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Write the full history to a timestamped file
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Archive the history log and saved locations
    Backup,
    /// Drop history older than the window
    Prune {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage saved locations
    Locations {
        #[command(subcommand)]
        action: LocationsCommand,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum LocationsCommand {
    List,
    Save { city: String },
}

impl Cli {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|key| !key.trim().is_empty())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(get_xdg_data_dir)
    }

    pub fn units(&self) -> Units {
        self.units.unwrap_or_default()
    }

    pub fn window_days(&self) -> u32 {
        self.window_days.unwrap_or(DEFAULT_WINDOW_DAYS)
    }

    /// Never below one second, `tokio::time::interval` panics on zero
    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval
            .unwrap_or(DEFAULT_REFRESH_INTERVAL)
            .max(1)
    }

    /// `None` when notifications are turned off with an empty command
    pub fn notify_command(&self) -> Option<String> {
        match &self.notify_command {
            Some(command) if command.trim().is_empty() => None,
            Some(command) => Some(command.clone()),
            None => Some(DEFAULT_NOTIFY_COMMAND.to_string()),
        }
    }

    /// Fills every option not given on the command line or in the
    /// environment from `file`
    pub fn merge(self, file: Cli) -> Cli {
        Cli {
            config: self.config,
            level: self.level.or(file.level),
            api_key: self.api_key.or(file.api_key),
            base_url: self.base_url.or(file.base_url),
            data_dir: self.data_dir.or(file.data_dir),
            units: self.units.or(file.units),
            window_days: self.window_days.or(file.window_days),
            refresh_interval: self.refresh_interval.or(file.refresh_interval),
            notify_command: self.notify_command.or(file.notify_command),
            command: self.command,
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> (Cli, ConfigSource) {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WEATHERDESK_CONFIG", "weatherdesk.toml")
    };

    let file_config: Cli = load_config(&source).unwrap_or_default();
    (cli_args.merge(file_config), source)
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
