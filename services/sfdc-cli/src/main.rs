//! Salesforce command-line client
//!
//! Single binary that:
//! 1. Loads `sfdc.toml` (or `--config` / CONFIG_PATH) plus secrets from env or files
//! 2. Authenticates with the username-password flow
//! 3. Runs one data, tooling or Apex REST command
//! 4. Prints the JSON result to stdout; logs go to stderr

mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use sfdc_api::{CustomApi, DataApi, ReadResult, ToolingApi};
use sfdc_auth::{Authenticator, PasswordGrant};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{ReqwestTransport, Transport};

use crate::config::Config;

const USAGE: &str = "usage: sfdc [--config <path>] <command>

commands:
  describe <type>                       describe an sObject type
  query <soql>                          run a SOQL query, following every page
  tooling-query <query>                 run a Tooling API query
  apex <source>                         execute anonymous Apex
  rest <METHOD> <path> [json]           call a custom Apex REST endpoint";

#[derive(Debug, PartialEq)]
enum Command {
    Describe { type_name: String },
    Query { soql: String },
    ToolingQuery { query: String },
    Apex { source: String },
    Rest {
        method: RestMethod,
        path: String,
        body: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

#[derive(Debug, PartialEq)]
struct Invocation {
    config_path: Option<String>,
    command: Command,
}

/// Parse arguments after the program name.
fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest: Vec<&str> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(path.clone());
        } else {
            rest.push(arg);
        }
    }

    let command = match rest.as_slice() {
        ["describe", type_name] => Command::Describe {
            type_name: type_name.to_string(),
        },
        ["query", soql] => Command::Query {
            soql: soql.to_string(),
        },
        ["tooling-query", query] => Command::ToolingQuery {
            query: query.to_string(),
        },
        ["apex", source] => Command::Apex {
            source: source.to_string(),
        },
        ["rest", method, path, extra @ ..] if extra.len() <= 1 => {
            let method = match method.to_ascii_uppercase().as_str() {
                "GET" => RestMethod::Get,
                "POST" => RestMethod::Post,
                "PATCH" => RestMethod::Patch,
                "PUT" => RestMethod::Put,
                "DELETE" => RestMethod::Delete,
                other => bail!("unsupported method {other}\n\n{USAGE}"),
            };
            let body = extra
                .first()
                .map(|json| serde_json::from_str::<Value>(json))
                .transpose()
                .context("request body is not valid JSON")?;
            Command::Rest {
                method,
                path: path.to_string(),
                body,
            }
        }
        _ => bail!("{USAGE}"),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        endpoint = %config.auth.endpoint,
        username = %config.auth.username,
        api_version = config.api.version,
        "configuration loaded"
    );

    let transport: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::with_timeout(config.api.timeout()).context("failed to build HTTP client")?,
    );
    let authenticator = Arc::new(build_authenticator(&config, transport.clone())?);

    let output = run(invocation.command, &config, authenticator, transport).await?;
    println!("{output}");
    Ok(())
}

fn build_authenticator(config: &Config, transport: Arc<dyn Transport>) -> Result<Authenticator> {
    let client_secret = config
        .auth
        .client_secret
        .clone()
        .context("client secret not loaded")?;
    let password = config
        .auth
        .password
        .clone()
        .context("password not loaded")?;
    let grant = PasswordGrant::new(
        config.auth.client_id.as_str(),
        client_secret,
        config.auth.username.as_str(),
        password,
    )?;
    Ok(Authenticator::new(
        grant,
        &config.auth.endpoint,
        config.auth.reauth_frequency(),
        transport,
    )?)
}

async fn run(
    command: Command,
    config: &Config,
    authenticator: Arc<Authenticator>,
    transport: Arc<dyn Transport>,
) -> Result<String> {
    let version = config.api.api_version()?;
    let value = match command {
        Command::Describe { type_name } => {
            let api = DataApi::new(authenticator, transport, version);
            api.describe(&type_name).await?
        }
        Command::Query { soql } => {
            let api = DataApi::new(authenticator, transport, version);
            query_all(&api, &soql).await?
        }
        Command::ToolingQuery { query } => {
            let api = ToolingApi::new(authenticator, transport, version);
            api.query(&query).await?
        }
        Command::Apex { source } => {
            let api = ToolingApi::new(authenticator, transport, version);
            api.execute_anonymous(&source).await?
        }
        Command::Rest { method, path, body } => {
            let api = CustomApi::new(authenticator, transport);
            let body = body.unwrap_or_else(|| Value::Object(Default::default()));
            let text = match method {
                RestMethod::Get => api.get(&path, &[]).await?,
                RestMethod::Delete => api.delete(&path, &[]).await?,
                RestMethod::Post => api.post(&path, &body).await?,
                RestMethod::Patch => api.patch(&path, &body).await?,
                RestMethod::Put => api.put(&path, &body).await?,
            };
            return Ok(text);
        }
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Run `soql` and follow `nextRecordsUrl` until the result is done.
async fn query_all(api: &DataApi, soql: &str) -> Result<Value> {
    let mut page: ReadResult<Value> = api.query(soql).await?;
    let total_size = page.total_size;
    let mut records = std::mem::take(&mut page.records);

    while !page.done {
        let Some(next) = page.next_records_url.take() else {
            bail!("query returned done=false without nextRecordsUrl");
        };
        info!(fetched = records.len(), total_size, "fetching next page");
        page = api.next_page(&next).await?;
        records.append(&mut page.records);
    }

    Ok(serde_json::json!({
        "totalSize": total_size,
        "done": true,
        "records": records,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use transport::{HttpResponse, ScriptedTransport, StatusCode};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_commands() {
        let invocation = parse_args(&args(&["describe", "Contact"])).unwrap();
        assert_eq!(invocation.config_path, None);
        assert_eq!(
            invocation.command,
            Command::Describe {
                type_name: "Contact".into()
            }
        );

        let invocation =
            parse_args(&args(&["--config", "/etc/sfdc.toml", "query", "SELECT Id FROM Contact"]))
                .unwrap();
        assert_eq!(invocation.config_path.as_deref(), Some("/etc/sfdc.toml"));
        assert_eq!(
            invocation.command,
            Command::Query {
                soql: "SELECT Id FROM Contact".into()
            }
        );

        assert_eq!(
            parse_args(&args(&["apex", "System.debug(1);"])).unwrap().command,
            Command::Apex {
                source: "System.debug(1);".into()
            }
        );
    }

    #[test]
    fn parses_rest_with_optional_body() {
        let invocation = parse_args(&args(&["rest", "post", "Accounts", r#"{"name":"Acme"}"#])).unwrap();
        assert_eq!(
            invocation.command,
            Command::Rest {
                method: RestMethod::Post,
                path: "Accounts".into(),
                body: Some(serde_json::json!({"name": "Acme"})),
            }
        );

        let invocation = parse_args(&args(&["rest", "GET", "Accounts/001"])).unwrap();
        assert!(matches!(invocation.command, Command::Rest { body: None, .. }));
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["describe"])).is_err());
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["rest", "TRACE", "x"])).is_err());
        assert!(parse_args(&args(&["rest", "POST", "x", "{not json"])).is_err());
        assert!(parse_args(&args(&["frobnicate", "x"])).is_err());
    }

    #[tokio::test]
    async fn query_all_follows_next_records_url() {
        let pages = [
            r#"{"totalSize":3,"done":false,"nextRecordsUrl":"/services/data/v44.0/query/01g-2","records":[{"Id":"a"},{"Id":"b"}]}"#,
            r#"{"totalSize":3,"done":true,"records":[{"Id":"c"}]}"#,
        ];
        let served = AtomicUsize::new(0);
        let transport = Arc::new(ScriptedTransport::from_fn(move |request| {
            if request.url.starts_with(sfdc_auth::PRODUCTION_TOKEN_ENDPOINT) {
                return Ok(HttpResponse::new(
                    StatusCode::OK,
                    r#"{"access_token":"at_1","instance_url":"https://na85.salesforce.com","id":"https://login.salesforce.com/id/00D/005","issued_at":"1551279592382","signature":"c2ln"}"#,
                ));
            }
            let n = served.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(StatusCode::OK, pages[n]))
        }));
        let grant = PasswordGrant::new(
            "3MVG9client",
            common::Secret::new("8204173310639812200".into()),
            "admin@example.com",
            common::Secret::new("hunter2".into()),
        )
        .unwrap();
        let authenticator = Arc::new(
            Authenticator::new(
                grant,
                sfdc_auth::PRODUCTION_TOKEN_ENDPOINT,
                Default::default(),
                transport.clone(),
            )
            .unwrap(),
        );
        let api = DataApi::new(
            authenticator,
            transport.clone(),
            sfdc_api::ApiVersion::new(44.0).unwrap(),
        );

        let result = query_all(&api, "SELECT Id FROM Contact").await.unwrap();

        assert_eq!(result["totalSize"], 3);
        assert_eq!(result["records"].as_array().unwrap().len(), 3);
        assert_eq!(result["records"][2]["Id"], "c");
        assert_eq!(
            transport.requests().last().unwrap().url,
            "https://na85.salesforce.com/services/data/v44.0/query/01g-2"
        );
    }
}
