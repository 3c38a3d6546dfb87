//! CLI command and subcommand definitions

use clap::{Args, Parser, Subcommand};
use dnac_core::PollPolicy;
use std::path::PathBuf;

/// Catalyst Centre API CLI
#[derive(Parser, Debug)]
#[command(name = "dnacctl")]
#[command(version, about = "Catalyst Centre (DNA Center) API CLI", long_about = None)]
pub struct Cli {
    /// Controller host or URL; https:// is assumed without a scheme
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Controller port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Username (overrides config file)
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Password (prefer DNAC_PASSWORD or the config file)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ./config.yaml, then ~/.config/dnac/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify the configured credentials
    Login,

    /// GET an endpoint
    Get(CallArgs),

    /// POST to an endpoint
    Post(CallArgs),

    /// PUT to an endpoint
    Put(CallArgs),

    /// DELETE an endpoint
    Delete(CallArgs),

    /// Inspect asynchronous tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Show or create CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Check that the controller answers (no login)
    Health,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments shared by the GET/POST/PUT/DELETE commands
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint path, e.g. `network-device` or `dna/intent/api/v1/site`
    pub path: String,

    /// Logical API version (v1, v2, system)
    #[arg(short = 'a', long)]
    pub api_version: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// JSON request body, or @FILE to read it from a file
    #[arg(short, long)]
    pub data: Option<String>,

    /// Wait for the task id returned by the call to finish
    #[arg(short, long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Polling schedule for task waits
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 125.0)]
    pub timeout: f64,

    /// Seconds before the second poll
    #[arg(long, default_value_t = 2.0)]
    pub interval: f64,

    /// Interval multiplier applied after each poll
    #[arg(long, default_value_t = 1.15)]
    pub backoff: f64,
}

impl PollArgs {
    pub fn policy(&self) -> dnac_core::Result<PollPolicy> {
        PollPolicy::from_secs(self.timeout, self.interval, self.backoff)
    }
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Show the current state of a task
    Status {
        /// Task ID
        id: String,
    },

    /// Poll a task until it finishes or the timeout passes
    Wait {
        /// Task ID
        id: String,

        #[command(flatten)]
        poll: PollArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a template configuration file
    Init {
        /// Destination (default: ~/.config/dnac/config.yaml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}
