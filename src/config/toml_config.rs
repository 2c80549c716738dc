use crate::utils::error::{PermitError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("permit-cascade/", env!("CARGO_PKG_VERSION"));
pub const AUSTIN_ISSUED_PERMITS_ENDPOINT: &str =
    "https://data.austintexas.gov/resource/3syk-w9eu.json";
pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default = "default_jurisdictions")]
    pub jurisdictions: Vec<JurisdictionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Pause after a networked adapter comes back empty.
    #[serde(default = "default_adapter_delay_ms")]
    pub adapter_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
}

/// One entry of the fallback list. Order in the file is priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JurisdictionConfig {
    Socrata(SocrataConfig),
    Manual(ManualPortalConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocrataConfig {
    pub name: String,
    pub portal: String,
    pub endpoint: String,
    pub app_token: Option<String>,
    pub max_results: Option<u32>,
    pub promote_for_county: Option<String>,
    #[serde(default)]
    pub field_mapping: SocrataFieldMapping,
}

/// Source column for each normalized permit field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocrataFieldMapping {
    pub permit_number: String,
    pub permit_type: String,
    pub status: String,
    pub description: String,
    pub address: String,
    pub issued_date: String,
    pub applied_date: String,
    pub link: String,
    pub parcel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPortalConfig {
    pub name: String,
    pub portal: String,
    /// `{q}` is replaced by the url-encoded address.
    pub search_url_template: String,
    pub promote_for_county: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_adapter_delay_ms() -> u64 {
    400
}

fn default_true() -> bool {
    true
}

fn default_geocoder_endpoint() -> String {
    NOMINATIM_ENDPOINT.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
            adapter_delay_ms: default_adapter_delay_ms(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_geocoder_endpoint(),
        }
    }
}

impl Default for SocrataFieldMapping {
    fn default() -> Self {
        Self {
            permit_number: "permit_number".to_string(),
            permit_type: "permit_type_desc".to_string(),
            status: "status_current".to_string(),
            description: "description".to_string(),
            address: "original_address1".to_string(),
            issued_date: "issue_date".to_string(),
            applied_date: "applieddate".to_string(),
            link: "link".to_string(),
            parcel: "tcad_id".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            geocoder: GeocoderConfig::default(),
            jurisdictions: default_jurisdictions(),
        }
    }
}

fn manual(name: &str, portal: &str, template: &str, promote: Option<&str>) -> JurisdictionConfig {
    JurisdictionConfig::Manual(ManualPortalConfig {
        name: name.to_string(),
        portal: portal.to_string(),
        search_url_template: template.to_string(),
        promote_for_county: promote.map(str::to_string),
    })
}

/// Austin first, then Travis/Williamson-area cities, Travis County, Hays, Harris/Houston.
pub fn default_jurisdictions() -> Vec<JurisdictionConfig> {
    vec![
        JurisdictionConfig::Socrata(SocrataConfig {
            name: "City of Austin".to_string(),
            portal: "Austin Build + Connect".to_string(),
            endpoint: AUSTIN_ISSUED_PERMITS_ENDPOINT.to_string(),
            app_token: None,
            max_results: Some(50),
            promote_for_county: None,
            field_mapping: SocrataFieldMapping::default(),
        }),
        manual("City of Round Rock", "Tyler CSS", "https://permits.roundrocktexas.gov/portal/", None),
        manual(
            "City of Pflugerville",
            "PublicAccess",
            "https://ams.pflugervilletx.gov/PublicAccess/default.aspx",
            None,
        ),
        manual("City of Cedar Park", "MyGovernmentOnline", "https://www.mygovernmentonline.org/", None),
        manual("City of Georgetown", "MyGovernmentOnline", "https://www.mygovernmentonline.org/", None),
        manual("City of Leander", "Tyler CSS", "https://permits.leandertx.gov/portal/", None),
        manual(
            "City of Hutto",
            "GovWell",
            "https://huttotx.portal.iworq.net/portalhome/huttotx",
            None,
        ),
        manual(
            "Travis County (TNR)",
            "E-Permitting",
            "https://www.traviscountytx.gov/tnr/permits",
            None,
        ),
        manual(
            "Hays County",
            "Inspections & Permitting",
            "https://hayscountytx.com/departments/development-services/inspections-and-permitting/",
            None,
        ),
        manual("City of Buda", "MyGovernmentOnline", "https://www.mygovernmentonline.org/", None),
        manual("City of Kyle", "Tyler CSS", "https://etrakit.cityofkyle.com/", None),
        manual(
            "City of San Marcos",
            "Permit Portal",
            "https://sanmarcostx.gov/1783/Permits-Inspections",
            None,
        ),
        manual("Harris County", "ePermits", "https://www.hcpid.org/epermits", Some("Harris")),
        manual(
            "City of Houston",
            "Houston Permit Portal",
            "https://www.houstonpermittingcenter.org/permits",
            Some("Harris"),
        ),
    ]
}

impl JurisdictionConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Socrata(c) => &c.name,
            Self::Manual(c) => &c.name,
        }
    }
}

impl SocrataConfig {
    /// An unresolved `${VAR}` placeholder counts as "no token".
    pub fn resolved_app_token(&self) -> Option<&str> {
        self.app_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !(t.starts_with("${") && t.ends_with('}')))
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PermitError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PermitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AUSTIN_APP_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| PermitError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind", &self.server.bind)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn adapter_delay(&self) -> Duration {
        Duration::from_millis(self.http.adapter_delay_ms)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.bind_addr()?;
        validation::validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 300)?;
        validation::validate_range("http.adapter_delay_ms", self.http.adapter_delay_ms, 0, 10_000)?;
        validation::validate_non_empty_string("http.user_agent", &self.http.user_agent)?;

        if self.geocoder.enabled {
            validation::validate_url("geocoder.endpoint", &self.geocoder.endpoint)?;
        }

        if self.jurisdictions.is_empty() {
            return Err(PermitError::MissingConfigError {
                field: "jurisdictions".to_string(),
            });
        }

        for (idx, jurisdiction) in self.jurisdictions.iter().enumerate() {
            let prefix = format!("jurisdictions[{}]", idx);
            match jurisdiction {
                JurisdictionConfig::Socrata(c) => {
                    validation::validate_non_empty_string(&format!("{}.name", prefix), &c.name)?;
                    validation::validate_url(&format!("{}.endpoint", prefix), &c.endpoint)?;
                    if let Some(limit) = c.max_results {
                        validation::validate_range(&format!("{}.max_results", prefix), limit, 1, 1000)?;
                    }
                }
                JurisdictionConfig::Manual(c) => {
                    validation::validate_non_empty_string(&format!("{}.name", prefix), &c.name)?;
                    validation::validate_url_template(
                        &format!("{}.search_url_template", prefix),
                        &c.search_url_template,
                    )?;
                }
            }
        }

        validation::validate_unique_names(
            "jurisdictions.name",
            self.jurisdictions.iter().map(JurisdictionConfig::name),
        )?;

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
