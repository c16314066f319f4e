// Dashboard Refresher
//
// Pulls pool stats and wallet balances for the unlocked wallet and
// pushes them to the UI queue. Runs hourly, and on demand after swaps.
//

use super::unmineable::PoolStatsSource;
use crate::chain::BalanceReader;
use crate::context::WalletSession;
use crate::event::{LogScope, LogSink, UiEvent};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DASHBOARD_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct DashboardRefresher {
    wallet: WalletSession,
    balances: Arc<dyn BalanceReader>,
    pool: Arc<dyn PoolStatsSource>,
    sink: LogSink,
}

impl DashboardRefresher {
    pub fn new(
        wallet: WalletSession,
        balances: Arc<dyn BalanceReader>,
        pool: Arc<dyn PoolStatsSource>,
        sink: LogSink,
    ) -> Self {
        Self {
            wallet,
            balances,
            pool,
            sink,
        }
    }

    /// Send fresh balances. Returns false when locked or on error.
    pub fn refresh_balances(&self) -> bool {
        let Some(address) = self.wallet.public_key() else {
            return false;
        };

        let native = match self.balances.native_balance(&address) {
            Ok(native) => native,
            Err(e) => {
                self.sink.log(LogScope::Dashboard, format!("Error fetching SOL balance: {}", e));
                return false;
            }
        };
        let tokens = match self.balances.token_balances(&address) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.sink.log(LogScope::Dashboard, format!("Error fetching wallet balances: {}", e));
                return false;
            }
        };

        self.sink.send(UiEvent::Balances { native, tokens });
        true
    }

    pub fn refresh_pool(&self) -> bool {
        let Some(address) = self.wallet.public_key() else {
            return false;
        };

        match self.pool.fetch_stats(&address) {
            Ok(stats) => {
                self.sink.send(UiEvent::Pool(stats));
                true
            }
            Err(e) => {
                self.sink.log(LogScope::Dashboard, format!("Error: {}", e));
                false
            }
        }
    }

    pub fn refresh_all(&self) {
        self.refresh_pool();
        self.refresh_balances();
    }

    /// Balance refresh off the UI thread
    pub fn spawn_balance_refresh(&self) -> thread::JoinHandle<()> {
        let this = self.clone();
        thread::spawn(move || {
            this.refresh_balances();
        })
    }

    /// Start periodic refresh thread
    pub fn start(self, interval: Duration) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            tracing::info!("[Dashboard] Refresh thread started ({:?})", interval);
            loop {
                self.refresh_all();
                thread::sleep(interval);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, PoolError};
    use crate::event::sink::drain_lines;
    use crate::pool::PoolStats;
    use crate::types::{HarvestToken, TokenBalance};
    use crate::wallet::Credentials;
    use ed25519_dalek::SigningKey;

    struct Balances;

    impl BalanceReader for Balances {
        fn native_balance(&self, _: &str) -> Result<f64, ChainError> {
            Ok(0.5)
        }
        fn token_balances(&self, _: &str) -> Result<Vec<TokenBalance>, ChainError> {
            Ok(vec![TokenBalance::zero(HarvestToken::SolXen)])
        }
    }

    struct DownPool;

    impl PoolStatsSource for DownPool {
        fn fetch_stats(&self, _: &str) -> Result<PoolStats, PoolError> {
            Err(PoolError::InvalidResponse("maintenance".into()))
        }
    }

    fn refresher() -> (DashboardRefresher, WalletSession, std::sync::mpsc::Receiver<UiEvent>) {
        let (sink, rx) = LogSink::channel();
        let wallet = WalletSession::default();
        let refresher =
            DashboardRefresher::new(wallet.clone(), Arc::new(Balances), Arc::new(DownPool), sink);
        (refresher, wallet, rx)
    }

    #[test]
    fn test_locked_wallet_sends_nothing() {
        let (refresher, _wallet, rx) = refresher();
        refresher.refresh_all();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_balances_and_pool_error() {
        let (refresher, wallet, rx) = refresher();
        wallet.unlock(Credentials::new(SigningKey::from_bytes(&[3u8; 32]), "password1"));

        assert!(refresher.refresh_balances());
        match rx.try_recv().unwrap() {
            UiEvent::Balances { native, tokens } => {
                assert_eq!(native, 0.5);
                assert_eq!(tokens.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert!(!refresher.refresh_pool());
        assert_eq!(drain_lines(&rx, LogScope::Dashboard), vec!["Error: unexpected pool response: maintenance"]);
    }
}
