use std::path::Path;

use alloy::primitives::Address;

use crate::error::{NoFlakeError, Result};
use crate::AppConfig;

pub const STAKING_ARTIFACT: &str = "EventStaking.json";
pub const TOKEN_ARTIFACT: &str = "MockUSDC.json";

/// Contract addresses; either may be unset, in which case dependent reads are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    pub event_staking: Option<Address>,
    pub token: Option<Address>,
}

fn parse_address(name: &str, raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|e| NoFlakeError::Configuration(format!("invalid {name} address {raw:?}: {e}")))
}

/// Reads `contractAddress` from a deployment artifact. A missing file is not an error.
fn load_from_artifact(dir: &Path, file: &str) -> Result<Option<Address>> {
    let path = dir.join(file);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(NoFlakeError::Configuration(format!("reading {}: {e}", path.display())))
        }
    };
    let doc: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| NoFlakeError::Configuration(format!("parsing {}: {e}", path.display())))?;
    match doc.get("contractAddress").and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => parse_address(file, s).map(Some),
        _ => Ok(None),
    }
}

fn resolve_one(name: &str, configured: Option<&str>, dir: Option<&Path>, artifact: &str) -> Result<Option<Address>> {
    match configured.map(str::trim) {
        Some(s) if !s.is_empty() => parse_address(name, s).map(Some),
        _ => match dir {
            Some(dir) => load_from_artifact(dir, artifact),
            None => Ok(None),
        },
    }
}

impl ContractAddresses {
    /// Environment first, deployment artifacts second.
    pub fn resolve(cfg: &AppConfig) -> Result<Self> {
        let dir = cfg.deployment_dir.as_deref();
        let addresses = Self {
            event_staking: resolve_one("event staking", cfg.event_staking_addr.as_deref(), dir, STAKING_ARTIFACT)?,
            token: resolve_one("token", cfg.token_addr.as_deref(), dir, TOKEN_ARTIFACT)?,
        };
        for missing in addresses.missing() {
            tracing::warn!(contract = missing, "contract address not configured");
        }
        Ok(addresses)
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.event_staking.is_none() { out.push("event_staking"); }
        if self.token.is_none() { out.push("token"); }
        out
    }

    /// Banner text shown while staked events cannot work.
    pub fn config_warning(&self) -> Option<String> {
        let missing = self.missing();
        if missing.is_empty() {
            return None;
        }
        Some(format!("contract addresses not configured: {}", missing.join(", ")))
    }

    pub fn require_staking(&self) -> Result<Address> {
        self.event_staking.ok_or_else(|| {
            NoFlakeError::Configuration("event staking contract address not configured".into())
        })
    }

    pub fn require_token(&self) -> Result<Address> {
        self.token
            .ok_or_else(|| NoFlakeError::Configuration("token contract address not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAKING: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const TOKEN: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

    fn cfg() -> AppConfig {
        AppConfig {
            rpc_http_url: "http://localhost:8545".into(),
            database_url: "sqlite::memory:".into(),
            listen_addr: "127.0.0.1:0".into(),
            event_staking_addr: None,
            token_addr: None,
            deployment_dir: None,
            private_key: None,
            token_decimals: 6,
            confirmation_poll_ms: 10,
            seed_sample_event: false,
        }
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("noflake-registry-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_unset_addresses_are_none() {
        let mut c = cfg();
        c.token_addr = Some("  ".into());
        let a = ContractAddresses::resolve(&c).unwrap();
        assert_eq!(a, ContractAddresses::default());
        assert_eq!(a.missing(), vec!["event_staking", "token"]);
        assert!(a.config_warning().unwrap().contains("event_staking"));
        assert!(a.require_staking().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_env_addresses_parse() {
        let mut c = cfg();
        c.event_staking_addr = Some(STAKING.into());
        c.token_addr = Some(TOKEN.into());
        let a = ContractAddresses::resolve(&c).unwrap();
        assert_eq!(a.require_staking().unwrap(), STAKING.parse::<Address>().unwrap());
        assert!(a.config_warning().is_none());
    }

    #[test]
    fn test_invalid_address_is_configuration_error() {
        let mut c = cfg();
        c.event_staking_addr = Some("0x1234".into());
        let err = ContractAddresses::resolve(&c).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_falls_back_to_deployment_artifacts() {
        let dir = temp_dir("artifacts");
        std::fs::write(
            dir.join(STAKING_ARTIFACT),
            serde_json::json!({"contractAddress": STAKING, "abi": []}).to_string(),
        )
        .unwrap();
        let mut c = cfg();
        c.deployment_dir = Some(dir.clone());
        c.token_addr = Some(TOKEN.into());
        let a = ContractAddresses::resolve(&c).unwrap();
        assert_eq!(a.event_staking, Some(STAKING.parse().unwrap()));
        assert_eq!(a.token, Some(TOKEN.parse().unwrap()));
        std::fs::remove_dir_all(dir).ok();
    }
}
