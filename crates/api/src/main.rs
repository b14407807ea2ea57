mod routes;

use std::sync::Arc;

use chrono::Utc;
use shared::contracts::provider::build_provider;
use shared::contracts::{AlloyGateway, ContractAddresses, ContractGateway};
use shared::repo::{EventRepo, RsvpRepo};
use shared::seed::seed_sample_event;
use shared::service::EventService;
use shared::storage::SqlKv;
use shared::{db::pool::Db, AppConfig};
use tracing_subscriber::{fmt, EnvFilter};

use routes::{router, AppState};

#[tokio::main]
async fn main() {
    init_tracing();
    let cfg = AppConfig::from_env().expect("config");
    let db = Db::connect(&cfg).await.expect("db connect");
    db.migrate().await.expect("migrate");

    let kv = Arc::new(SqlKv::new(db));
    let events = EventRepo::new(kv.clone());
    let rsvps = RsvpRepo::new(kv);
    if cfg.seed_sample_event {
        seed_sample_event(&events, Utc::now()).await;
    }

    // Missing addresses are tolerated; staked flows answer with a config error.
    let addresses = ContractAddresses::resolve(&cfg).expect("contract addresses");
    let provider = build_provider(&cfg).expect("provider");
    let gateway = AlloyGateway::new(provider, addresses, cfg.confirmation_poll_interval());
    let chain_id = match gateway.chain_id().await {
        Ok(id) => {
            tracing::info!(id, signer = ?gateway.account(), "provider initialized");
            match gateway.decimals().await {
                Ok(Some(decimals)) if decimals != cfg.token_decimals => tracing::warn!(
                    configured = cfg.token_decimals,
                    on_chain = decimals,
                    "token decimals mismatch; deposits are scaled with the configured value"
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "reading token decimals failed"),
            }
            Some(id)
        }
        Err(e) => {
            tracing::warn!(error = %e, "chain id unavailable; on-chain reads will fail until the node is reachable");
            None
        }
    };

    let gateway: Arc<dyn ContractGateway> = Arc::new(gateway);
    let service = EventService::new(events, rsvps, gateway, cfg.token_decimals);
    let app = router(Arc::new(AppState { service, chain_id }));

    let addr = cfg.listen_addr.parse().expect("listen addr");
    tracing::info!(?addr, ?chain_id, "api listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();
}
