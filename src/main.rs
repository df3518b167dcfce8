use anyhow::Context;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info, warn};

use ton_deposit_bot::{
    api::ToncenterClient,
    bot::TelegramBot,
    cache::{KeyValueStore, MemoryStore, RedisStore},
    context::AppContext,
    deposits::DepositWatcher,
    ledger::BalanceLedger,
    monitoring::{init_tracing, BotMetrics, LogFormat, MetricsServer},
    notify::TelegramNotifier,
    tonconnect::{BridgeClient, TonConnectorFactory, WalletCatalog},
    utils::Config,
    wallet::ConnectorRegistry,
};

const REDIS_KEY_PREFIX: &str = "ton-deposit-bot:";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing(LogFormat::from_env())?;

    info!("🚀 Starting TON deposit bot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);

    info!("🌐 Network: {:?} ({})", config.network, config.api_base_url());
    if config.api_key.is_empty() {
        warn!("No Toncenter API key configured, requests will be rate limited");
    }

    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisStore::connect(url, REDIS_KEY_PREFIX)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            warn!("REDIS_URL not set, balances and wallet sessions are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let metrics = Arc::new(BotMetrics::new()?);
    let ledger = Arc::new(BalanceLedger::new(store.clone()));

    let http = reqwest::Client::new();
    let catalog = Arc::new(WalletCatalog::new(http.clone(), config.wallets_list_url.clone()));
    let factory = TonConnectorFactory::new(
        BridgeClient::new(http),
        catalog,
        store.clone(),
        config.manifest_url.clone(),
    );
    let registry = Arc::new(ConnectorRegistry::new(Arc::new(factory)));

    let bot = Bot::new(&config.bot_token);
    let ctx = AppContext::new(config.clone(), registry, ledger.clone(), metrics.clone());

    if let Some(addr) = config.metrics_addr {
        let server = MetricsServer::new(addr, metrics.clone());
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let watcher = DepositWatcher::new(
        Arc::new(ToncenterClient::from_config(&config)?),
        store,
        ledger,
        Arc::new(TelegramNotifier::new(bot.clone())),
        metrics,
        config.deposit_address.clone(),
        config.deposit_poll_interval(),
    );
    let watcher_task = tokio::spawn(watcher.run());

    TelegramBot::new(bot, ctx).run().await;

    watcher_task.abort();
    info!("👋 Shutdown complete");
    Ok(())
}
