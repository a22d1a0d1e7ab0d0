//! CLI argument definitions for evexport-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use evexport_core::config::EvexportConfig;

use crate::source::InputSource;

/// evexport event export daemon.
///
/// Reads host inspection events as JSON lines, classifies them into
/// alerts and flows, and forwards them to a collector over TCP or UDP
/// without ever blocking the reader on a slow peer.
#[derive(Parser, Debug)]
#[command(name = "evexport-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to evexport.toml configuration file.
    #[arg(short, long, default_value = "/etc/evexport/evexport.toml")]
    pub config: PathBuf,

    /// Host event input: a file of JSON lines, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Override the export endpoint (tcp://host:port or udp://host:port).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut EvexportConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(endpoint) = &self.endpoint {
            config.exporter.endpoint.clone_from(endpoint);
        }
    }

    /// Resolve the `--input` argument.
    pub fn input_source(&self) -> InputSource {
        InputSource::from_arg(&self.input)
    }
}
