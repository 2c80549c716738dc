use clap::Parser;
use permit_cascade::utils::{logger, validation::Validate};
use permit_cascade::{app, CliConfig, PermitError, PermitSearchService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting permit-cascade");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.load_service_config() {
        Ok(config) => config,
        Err(e) => exit_on_startup_error("Failed to load configuration", &e),
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        exit_on_startup_error("Configuration validation failed", &e);
    }

    let addr = config.bind_addr()?;
    let service = match PermitSearchService::from_config(&config) {
        Ok(service) => Arc::new(service),
        Err(e) => exit_on_startup_error("Failed to build adapters", &e),
    };

    app::start(addr, service).await
}

fn exit_on_startup_error(context: &str, e: &PermitError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 啟動失敗一律非零退出
    std::process::exit(e.exit_code().max(1));
}
