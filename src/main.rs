// xoon - terminal mining dashboard for unMineable SOL payouts
//
// Runs CPU/GPU miners, swaps mined SOL into reward tokens on a schedule
// and keeps an encrypted local wallet.

mod chain;
mod config;
mod context;
mod error;
mod event;
mod exchange;
mod harvest;
mod logging;
mod miner;
mod pool;
mod tui;
mod types;
mod wallet;

use anyhow::Context;
use chain::SolanaRpc;
use config::{read_config, start_config_watcher};
use context::{AppContext, AppPaths};
use event::LogSink;
use exchange::{start_price_refresher, JupiterClient, PriceCache, PRICE_REFRESH_INTERVAL};
use harvest::{HarvestScheduler, Harvester};
use miner::{MinerSupervisor, BACKENDS};
use pool::{DashboardRefresher, UnmineableClient, DASHBOARD_REFRESH_INTERVAL};
use std::fs;
use std::sync::mpsc::channel;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let paths = AppPaths::from_executable().context("cannot resolve executable directory")?;
    logging::init(&paths.log_file()).context("cannot open debug.log")?;
    tracing::info!("[Main] Starting xoon {} in {}", env!("CARGO_PKG_VERSION"), paths.root().display());

    // Creates the default config on first run
    if let Err(e) = read_config(&paths.config_file()) {
        tracing::warn!("[Main] Config not usable yet: {}", e);
    }
    for backend in BACKENDS {
        let dir = paths.miner_dir(backend.dir_name);
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("[Main] Failed to create {}: {}", dir.display(), e);
        }
    }

    let (sink, events) = LogSink::channel();
    let ctx = AppContext::new(paths, sink.clone());

    let rpc = Arc::new(SolanaRpc::mainnet());
    let jupiter = Arc::new(JupiterClient::new(rpc.clone())?);
    let prices = PriceCache::default();

    let supervisors: Vec<MinerSupervisor> = BACKENDS
        .into_iter()
        .map(|backend| MinerSupervisor::new(backend, sink.clone()))
        .collect();

    let harvester = Harvester::new(
        ctx.wallet.clone(),
        rpc.clone(),
        jupiter.clone(),
        prices.clone(),
        sink.clone(),
    );
    let dashboard = DashboardRefresher::new(
        ctx.wallet.clone(),
        rpc,
        Arc::new(UnmineableClient::new()?),
        sink.clone(),
    );

    // Both the UI save button and the file watcher can trigger a reload
    let (reload_tx, reload_rx) = channel();
    let _scheduler = HarvestScheduler::new(ctx.paths.config_file(), harvester.clone(), sink.clone()).start(reload_rx);
    let _watcher = start_config_watcher(ctx.paths.config_file(), reload_tx.clone());
    let _prices = start_price_refresher(prices, jupiter, sink.clone(), PRICE_REFRESH_INTERVAL);
    let _dashboard = dashboard.clone().start(DASHBOARD_REFRESH_INTERVAL);

    let app = tui::App::new(ctx, supervisors, harvester, dashboard, reload_tx, events);
    tui::run(app)?;

    tracing::info!("[Main] Exited cleanly");
    Ok(())
}
