use crate::{
    cli::args::{EmulateArgs, TransformArgs, VerifyArgs},
    core::{
        config::{ConfigLoader, HarnessConfig},
        fixtures::load_fixtures,
        harness::{Harness, HarnessSettings},
        runtime::{serve_emulator, HttpRuntime, InProcessRuntime},
        transform::{EventEnvelope, SpreadTransform, TransformFunction},
    },
    Result,
};
use anyhow::{anyhow, Context};
use reqwest::Url;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Resolve the harness config: file (explicit or workspace default), env, then flags.
pub fn resolve_verify_config(args: &VerifyArgs, workspace: &Path) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("config file {} does not exist", path.display()));
            }
            ConfigLoader::load(Some(path))?
        }
        None => ConfigLoader::load_from_workspace(workspace)?,
    };

    if let Some(url) = &args.runtime_url {
        config.runtime.url = url.clone();
    }
    if let Some(fixtures) = &args.fixtures {
        config.fixtures.path = fixtures.clone();
    }
    if let Some(host) = &args.host_address {
        config.receiver.host_address = host.clone();
    }
    if let Some(bind) = &args.receiver_bind {
        config.receiver.bind = bind.clone();
    }
    if let Some(timeout) = args.delivery_timeout {
        config.timeouts.delivery = timeout;
    }

    ConfigLoader::validate_config(&config)?;
    Ok(config)
}

pub async fn verify(args: VerifyArgs) -> Result<()> {
    let workspace = std::env::current_dir().context("failed to resolve working directory")?;
    let config = resolve_verify_config(&args, &workspace)?;
    let fixture_path = if config.fixtures.path.is_absolute() {
        config.fixtures.path.clone()
    } else {
        workspace.join(&config.fixtures.path)
    };
    let fixtures = load_fixtures(&fixture_path)?;
    tracing::info!(
        fixtures = fixtures.len(),
        runtime = %config.runtime.url,
        "starting transformer verification"
    );

    let base_url = Url::parse(&config.runtime.url)
        .with_context(|| format!("invalid runtime URL {}", config.runtime.url))?;
    let runtime = HttpRuntime::with_timeout(base_url, config.runtime.request_timeout)?;
    let harness = Harness::new(runtime, HarnessSettings::from_config(&config)?);

    let report = harness.run(&fixtures).await;
    println!("{}", report.render(args.format)?);

    if !report.passed() {
        return Err(anyhow!(
            "verification failed: {}",
            report
                .failure
                .as_ref()
                .map(|failure| failure.message.as_str())
                .unwrap_or("unknown failure")
        ));
    }
    Ok(())
}

pub async fn transform(args: TransformArgs) -> Result<()> {
    let raw = match &args.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read envelope {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read envelope from stdin")?;
            buffer
        }
    };
    let envelope: EventEnvelope =
        serde_json::from_str(&raw).context("input is not a valid event envelope")?;
    let definition: Value =
        serde_json::from_str(&args.definition).context("--definition is not valid JSON")?;

    let output = SpreadTransform.transform(&envelope, &definition).await?;
    let rendered = if args.wrap {
        json!({ "value": output })
    } else {
        output
    };
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub async fn emulate(args: EmulateArgs) -> Result<()> {
    let bind: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind))?;
    let runtime = InProcessRuntime::new(Arc::new(SpreadTransform));
    serve_emulator(runtime, bind, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping emulator");
        }
    })
    .await?;
    Ok(())
}
