//! Command-line configuration surface

use clap::Parser;

/// MySQL wire protocol front end for data living in Redis
#[derive(Parser, Debug, Clone)]
#[command(name = "mini-mysql-redis", version, about)]
pub struct Config {
    /// TCP listen port for the MySQL front end
    #[arg(short, long, default_value_t = 3306)]
    pub port: u16,

    /// Backing store endpoint
    #[arg(short, long, default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Maximum rows returned by a full-scan query (0 disables scans)
    #[arg(long, default_value_t = 100)]
    pub scan_limit: usize,

    /// Maximum requests per client IP per window (0 disables limiting)
    #[arg(long, default_value_t = 100)]
    pub rate_limit: u32,

    /// Rate-limit window length in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    /// Permit full-scan queries (pass `--allow-scan false` to reject them)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub allow_scan: bool,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
