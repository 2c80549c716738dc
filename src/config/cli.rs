use crate::config::toml_config::ServiceConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "permit-cascade")]
#[command(about = "Building-permit lookup with jurisdiction fallback")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in jurisdiction list when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override server.bind from the config file
    #[arg(long)]
    pub bind: Option<String>,

    /// Skip address geocoding
    #[arg(long)]
    pub no_geocode: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 載入配置檔並套用命令列覆蓋設定
    pub fn load_service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if self.no_geocode {
            config.geocoder.enabled = false;
        }

        Ok(config)
    }
}
