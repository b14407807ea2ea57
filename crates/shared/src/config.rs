use std::path::PathBuf;
use std::time::Duration;

use figment::{providers::Env, Figment};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub rpc_http_url: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// EventStaking contract; unset means staked events are unavailable.
    #[serde(default)]
    pub event_staking_addr: Option<String>,
    /// ERC-20 deposit token.
    #[serde(default)]
    pub token_addr: Option<String>,
    /// Directory with `EventStaking.json` / `MockUSDC.json` deployment artifacts,
    /// consulted when the address variables are unset.
    #[serde(default)]
    pub deployment_dir: Option<PathBuf>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    #[serde(default = "default_seed_sample_event")]
    pub seed_sample_event: bool,
}

fn default_database_url() -> String { "sqlite://noflake.db?mode=rwc".into() }
fn default_listen_addr() -> String { "0.0.0.0:8080".into() }
fn default_token_decimals() -> u8 { 6 }
fn default_confirmation_poll_ms() -> u64 { 1000 }
fn default_seed_sample_event() -> bool { true }

impl AppConfig {
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenvy::dotenv().ok();
        Self::from_figment(Figment::new().merge(Env::prefixed("NF_")))
    }

    pub fn from_figment(fig: Figment) -> Result<Self, figment::Error> {
        fig.extract()
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms.max(1))
    }
}
