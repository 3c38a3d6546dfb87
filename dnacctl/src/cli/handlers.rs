//! Command execution handlers

use anyhow::{Context, Result};
use dnac_core::{HttpMethod, JsonResponse};
use serde_json::Value;
use std::path::Path;

use crate::client::Dnac;
use crate::config::CliConfig;
use crate::format::{
    format_config, format_health, format_response, format_success, format_task,
    format_waited_call,
};

use super::commands::*;

/// Open a session and log in with the configured credentials.
pub async fn connect(config: &CliConfig) -> Result<Dnac> {
    let base_url = config.base_url()?;
    if config.auth.username.is_empty() {
        return Err(anyhow::anyhow!(
            "No username configured. Set auth.username in the config file, \
             DNAC_USERNAME, or --username"
        ));
    }

    let mut dnac = Dnac::new(&base_url, config.client_options())?;
    dnac.login(&config.auth.username, &config.auth.password)
        .await
        .with_context(|| format!("Cannot log in to {}", dnac.base_url()))?;

    Ok(dnac)
}

/// Handle login command
pub fn handle_login(dnac: &Dnac, config: &CliConfig, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "url": dnac.base_url().as_str(),
                "username": config.auth.username,
                "authenticated": dnac.is_authenticated(),
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Table => {
            println!(
                "{}",
                format_success(&format!(
                    "Authenticated to {} as {}",
                    dnac.base_url(),
                    config.auth.username
                ))
            );
        }
    }

    Ok(())
}

/// Parse `--data`, reading `@FILE` from disk.
fn parse_body(data: &str) -> Result<Value> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read request body from {}", path))?,
        None => data.to_string(),
    };

    serde_json::from_str(&text).context("Request body is not valid JSON")
}

/// Task id returned by a mutating call, under `response` or at the root.
fn task_id(response: &JsonResponse) -> Option<&str> {
    response
        .lookup("response.taskId")
        .as_str()
        .or_else(|| response.get("taskId").as_str())
}

/// Handle get/post/put/delete commands
pub async fn handle_call(
    dnac: &Dnac,
    method: HttpMethod,
    args: CallArgs,
    format: &OutputFormat,
) -> Result<()> {
    let body = args.data.as_deref().map(parse_body).transpose()?;

    let mut call = dnac.call(method, &args.path);
    if let Some(version) = args.api_version {
        call = call.version(version);
    }
    for (key, value) in &args.params {
        call = call.param(key.as_str(), value);
    }
    if let Some(body) = &body {
        call = call.json(body);
    }

    let response = call.await?;
    if !args.wait {
        println!("{}", format_response(&response, &format.into())?);
        return Ok(());
    }

    let id = task_id(&response)
        .ok_or_else(|| anyhow::anyhow!("Response carries no taskId to wait on"))?;
    let done = dnac.wait_on_task(id, args.poll.policy()?).await?;
    println!(
        "{}",
        format_waited_call(&response, &done.record, &format.into())?
    );

    Ok(())
}

/// Handle task commands
pub async fn handle_task(dnac: &Dnac, command: TaskCommands, format: &OutputFormat) -> Result<()> {
    match command {
        TaskCommands::Status { id } => {
            let record = dnac.task_status(&id).await?;
            println!("{}", format_task(&record, &format.into())?);
        }
        TaskCommands::Wait { id, poll } => {
            let done = dnac.wait_on_task(&id, poll.policy()?).await?;
            println!("{}", format_task(&done.record, &format.into())?);
            if matches!(format, OutputFormat::Table) {
                println!(
                    "{}",
                    format_success(&format!(
                        "Task {} finished after {} polls ({:.1}s)",
                        done.record.task_id,
                        done.polls,
                        done.elapsed.as_secs_f64()
                    ))
                );
            }
        }
    }

    Ok(())
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", format_config(current_config, &format.into())?);
        }
        ConfigCommands::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => CliConfig::default_path()?,
            };
            if path.exists() && !force {
                return Err(anyhow::anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }

            CliConfig::template().save_to(&path)?;
            println!(
                "{}",
                format_success(&format!("Wrote configuration template to {}", path.display()))
            );
        }
    }

    Ok(())
}

/// Handle health command
pub async fn handle_health(config: &CliConfig, format: &OutputFormat) -> Result<()> {
    let dnac = Dnac::new(&config.base_url()?, config.client_options())?;
    let reachable = dnac.ping().await?;

    println!(
        "{}",
        format_health(dnac.base_url().as_str(), reachable, &format.into())?
    );
    if !reachable {
        return Err(anyhow::anyhow!("Controller {} is not reachable", dnac.base_url()));
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_body_inline_and_file() {
        assert_eq!(parse_body(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert!(parse_body("{not json").is_err());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, r#"[{"name": "UK"}]"#).unwrap();
        let arg = format!("@{}", path.display());
        assert_eq!(parse_body(&arg).unwrap(), json!([{"name": "UK"}]));
        assert!(parse_body("@/nonexistent/body.json").is_err());
    }

    #[test]
    fn test_task_id_lookup() {
        let wrapped = JsonResponse::new(
            json!({"response": {"taskId": "t1", "url": "/api/v1/task/t1"}}),
            202,
            HttpMethod::Post,
            "site",
        );
        assert_eq!(task_id(&wrapped), Some("t1"));

        let bare = JsonResponse::new(json!({"taskId": "t2"}), 202, HttpMethod::Post, "site");
        assert_eq!(task_id(&bare), Some("t2"));

        let none = JsonResponse::new(json!({"response": []}), 200, HttpMethod::Get, "site");
        assert_eq!(task_id(&none), None);
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let config = CliConfig::default();

        let init = |force| ConfigCommands::Init {
            path: Some(path.clone()),
            force,
        };
        handle_config(init(false), &config, &OutputFormat::Json).unwrap();
        assert!(handle_config(init(false), &config, &OutputFormat::Json).is_err());
        handle_config(init(true), &config, &OutputFormat::Json).unwrap();

        let written = CliConfig::load_from(&path).unwrap();
        assert_eq!(written, CliConfig::template());
    }

    #[tokio::test]
    async fn test_connect_requires_host_and_username() {
        let config = CliConfig::default();
        assert!(connect(&config).await.is_err());

        let mut config = CliConfig::template();
        config.auth.username.clear();
        let err = connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("No username configured"));
    }
}
