//! weatherdesk core library
//!
//! Shared utilities for the weatherdesk binary and library:
//! - Configuration loading (XDG-compliant)
//! - File system utilities
//! - Application-wide defaults

mod config;
pub mod fs;

pub use config::{find_config_file, get_xdg_data_dir, load_config, ConfigSource};
pub use fs::{ensure_dir, file_is_empty, path_exists};

/// Application name used for XDG paths
pub const APP_NAME: &str = "weatherdesk";

/// Default trailing window for history queries and pruning (days)
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Default number of forecast days requested from the provider
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// Default refresh interval for `watch` (10 minutes)
pub const DEFAULT_REFRESH_INTERVAL: u64 = 600;
