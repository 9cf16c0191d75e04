use anyhow::Context;
use clap::Parser;
use invoice_component::adapters::provisioning;
use invoice_component::config::{CliConfig, Command};
use invoice_component::utils::{logger, validation::Validate};
use invoice_component::{
    ComponentConfig, ComponentDescriptor, InvocationContext, InvoiceError, InvoiceGenerator,
    InvoiceRequest, LocalContentStore, ProcessRenderer,
};
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting invoice-component");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Command::Describe = cli.command {
        let descriptor = ComponentDescriptor::generate_invoice();
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    // 載入並驗證配置
    let config = match ComponentConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&cli.command, &config).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            let Some(invoice_error) = e.downcast_ref::<InvoiceError>() else {
                return Err(e);
            };
            tracing::error!(
                "❌ {} (Category: {:?})",
                invoice_error,
                invoice_error.category()
            );
            eprintln!("❌ {}", invoice_error.user_friendly_message());
            eprintln!("💡 {}", invoice_error.recovery_suggestion());
            std::process::exit(invoice_error.exit_code());
        }
    }
}

async fn run(command: &Command, config: &ComponentConfig) -> anyhow::Result<String> {
    match command {
        Command::Provision => {
            let path = provisioning::ensure_renderer(config).await?;
            Ok(format!("✅ Renderer available at {}", path.display()))
        }
        Command::Generate { payload, user_id } => {
            let raw = read_payload(payload).await?;
            let request: InvoiceRequest = serde_json::from_str(&raw).map_err(|e| {
                InvoiceError::validation(format!("payload is not a valid invoice request: {}", e))
            })?;

            provisioning::ensure_renderer(config).await?;
            let renderer = ProcessRenderer::from_config(config)?;
            tracing::debug!("Using renderer {}", renderer.binary_path().display());
            let store = LocalContentStore::from_config(config);
            let work_dir = config.work_dir()?;
            tokio::fs::create_dir_all(&work_dir)
                .await
                .with_context(|| format!("cannot create work dir {}", work_dir.display()))?;

            let generator = InvoiceGenerator::new(renderer, store, work_dir);
            let response = generator
                .generate(request, &InvocationContext::new(user_id.clone()))
                .await?;
            Ok(serde_json::to_string_pretty(&response)?)
        }
        Command::Describe => Ok(serde_json::to_string_pretty(
            &ComponentDescriptor::generate_invoice(),
        )?),
    }
}

async fn read_payload(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("failed to read payload from stdin")?;
        return Ok(raw);
    }
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read payload file {}", source))
}
