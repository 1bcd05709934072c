pub mod credentials;
pub mod toml_config;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "tamper-toggle")]
#[command(about = "Toggle tamper protection on Central endpoints from a staff roster")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "tamper-toggle.toml")]
    pub config: String,

    /// Override the credentials file from the config
    #[arg(long)]
    pub credentials: Option<String>,

    /// Override the tenant name from the config
    #[arg(long)]
    pub tenant: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Match roster rows against endpoints and set their tamper protection
    Sweep {
        /// Only read tamper status, do not change it
        #[arg(long)]
        dry_run: bool,

        /// Override the roster file from the config
        #[arg(long)]
        roster: Option<String>,
    },
    /// Show the endpoints of a user and their tamper protection status
    User {
        /// Exchange login of the user
        username: String,
    },
    /// Show the tamper protection status of one endpoint
    Status { endpoint_id: String },
    /// Enable or disable tamper protection on one endpoint
    Set {
        endpoint_id: String,

        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}
