//! dnacctl
//!
//! Command-line interface for the Catalyst Centre (DNA Center) REST API.

use anyhow::Result;
use clap::Parser;
use dnac_core::HttpMethod;
use dnacctl::cli::{
    connect, generate_completion, handle_call, handle_config, handle_health, handle_login,
    handle_task, Cli, Commands, OutputFormat,
};
use dnacctl::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = CliConfig::builder();

    // Load config file (unless --no-config is specified)
    if !cli.no_config {
        builder = builder.with_config_file(cli.config.as_deref())?;
    }

    // Apply environment variable overrides
    builder = builder.with_env_overrides();

    // Apply CLI argument overrides (highest priority)
    if let Some(ref host) = cli.host {
        builder = builder.with_host(host)?;
    }
    if let Some(port) = cli.port {
        builder = builder.with_port(port);
    }
    if let Some(ref username) = cli.username {
        builder = builder.with_username(username);
    }
    if let Some(ref password) = cli.password {
        builder = builder.with_password(password);
    }
    if cli.insecure {
        builder = builder.with_verify_ssl(false);
    }
    if let Some(timeout) = cli.request_timeout {
        builder = builder.with_timeout(timeout)?;
    }
    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }

    // Build final configuration with validation
    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            if cli.verbose {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(1);
        }
    };

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let verbose = config.verbose;

    init_tracing(verbose);

    // The session is dropped, and its transport released, at the end of each arm
    let result = match cli.command {
        Commands::Login => match connect(&config).await {
            Ok(dnac) => handle_login(&dnac, &config, &output_format),
            Err(e) => Err(e),
        },
        Commands::Get(args) => run_call(&config, HttpMethod::Get, args, &output_format).await,
        Commands::Post(args) => run_call(&config, HttpMethod::Post, args, &output_format).await,
        Commands::Put(args) => run_call(&config, HttpMethod::Put, args, &output_format).await,
        Commands::Delete(args) => {
            run_call(&config, HttpMethod::Delete, args, &output_format).await
        }
        Commands::Task { command } => match connect(&config).await {
            Ok(dnac) => handle_task(&dnac, command, &output_format).await,
            Err(e) => Err(e),
        },
        Commands::Config { command } => handle_config(command, &config, &output_format),
        Commands::Health => handle_health(&config, &output_format).await,
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run_call(
    config: &CliConfig,
    method: HttpMethod,
    args: dnacctl::cli::CallArgs,
    format: &OutputFormat,
) -> Result<()> {
    let dnac = connect(config).await?;
    handle_call(&dnac, method, args, format).await
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
