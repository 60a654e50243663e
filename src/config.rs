use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub network: NetworkConfig,
    pub packages: PackageConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    #[serde(default)]
    pub walrus: WalrusConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub graphql_url: String,
    /// Base URL of the web app serving the chat and ranking endpoints.
    pub app_url: String,
    pub walrus_publisher_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// On-chain package ids and the funding coin type.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub market: String,
    pub oracle: String,
    pub usdc_type: String,
    #[serde(default = "default_clock")]
    pub clock: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: default_polling_interval(),
        }
    }
}

impl ChatConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }
}

/// Amounts used by the add-liquidity action, all fixed-point 1e9.
#[derive(Debug, Clone, Deserialize)]
pub struct LiquidityConfig {
    #[serde(default = "default_lp_amount")]
    pub lp_amount: u64,
    #[serde(default = "default_seed_order_amount")]
    pub seed_order_amount: u64,
    #[serde(default = "default_seed_order_price")]
    pub seed_order_price: u64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            lp_amount: default_lp_amount(),
            seed_order_amount: default_seed_order_amount(),
            seed_order_price: default_seed_order_price(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalrusConfig {
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_deletable")]
    pub deletable: bool,
}

impl Default for WalrusConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            deletable: default_deletable(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub csv_logging: bool,
    pub csv_log_path: String,
}

fn default_request_timeout() -> u64 { 30 }
fn default_clock() -> String { "0x6".to_string() }
fn default_polling_interval() -> u64 { 30 }
fn default_lp_amount() -> u64 { 50_000_000_000 }
fn default_seed_order_amount() -> u64 { 50_000_000_000 }
fn default_seed_order_price() -> u64 { 27_500_000_000 }
fn default_epochs() -> u32 { 3 }
fn default_deletable() -> bool { true }

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Connected account; absent means the client is not ready to trade.
    pub wallet_address: Option<String>,
    /// Signer relay that holds the wallet keys. Required outside dry-run mode.
    pub signer_url: Option<String>,
    pub graphql_url: Option<String>,
    pub app_url: Option<String>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Environment values take precedence over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.graphql_url {
            self.network.graphql_url = url.clone();
        }
        if let Some(url) = &env.app_url {
            self.network.app_url = url.clone();
        }
        if let Some(dry_run) = env.dry_run {
            self.system.dry_run = dry_run;
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            wallet_address: non_empty_var("NEREUS_WALLET_ADDRESS"),
            signer_url: non_empty_var("NEREUS_SIGNER_URL"),
            graphql_url: non_empty_var("NEREUS_GRAPHQL_URL"),
            app_url: non_empty_var("NEREUS_APP_URL"),
            dry_run: match non_empty_var("DRY_RUN") {
                Some(v) => Some(
                    v.parse()
                        .with_context(|| format!("DRY_RUN must be true or false, got {}", v))?,
                ),
                None => None,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
