use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;

use crate::error::{NoFlakeError, Result};
use crate::AppConfig;

/// HTTP provider plus the account that signs writes, when a key is configured.
#[derive(Clone, Debug)]
pub struct SharedProvider {
    pub provider: DynProvider,
    pub account: Option<Address>,
}

pub fn build_provider(cfg: &AppConfig) -> Result<SharedProvider> {
    build_provider_from_url(&cfg.rpc_http_url, cfg.private_key.as_deref())
}

/// Connection is lazy; nothing is sent to the node until the first call.
pub fn build_provider_from_url(rpc_url: &str, private_key: Option<&str>) -> Result<SharedProvider> {
    let url = rpc_url
        .parse()
        .map_err(|e| NoFlakeError::Configuration(format!("invalid rpc url {rpc_url:?}: {e}")))?;

    match private_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => {
            let signer: PrivateKeySigner = key
                .parse()
                .map_err(|e| NoFlakeError::Configuration(format!("invalid private key: {e}")))?;
            let account = signer.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased();
            tracing::info!(%account, "provider initialized with signer");
            Ok(SharedProvider { provider, account: Some(account) })
        }
        None => {
            let provider = ProviderBuilder::new().connect_http(url).erased();
            tracing::info!("provider initialized read-only");
            Ok(SharedProvider { provider, account: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known first anvil/hardhat dev key.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_read_only_provider() {
        let p = build_provider_from_url("http://127.0.0.1:8545", None).unwrap();
        assert!(p.account.is_none());
        let p = build_provider_from_url("http://127.0.0.1:8545", Some("  ")).unwrap();
        assert!(p.account.is_none());
    }

    #[test]
    fn test_signer_account_derived() {
        let p = build_provider_from_url("http://127.0.0.1:8545", Some(DEV_KEY)).unwrap();
        assert_eq!(p.account, Some(DEV_ACCOUNT.parse().unwrap()));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(build_provider_from_url("not a url", None).unwrap_err().is_configuration_error());
        assert!(build_provider_from_url("http://127.0.0.1:8545", Some("0x12"))
            .unwrap_err()
            .is_configuration_error());
    }
}
