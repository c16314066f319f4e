// Harvester
//
// One harvest firing: read balances, check the reserve and fee gates,
// top up the governance token if needed, then swap. Also runs the
// one-shot manual harvest from the UI form.
//

use crate::chain::BalanceReader;
use crate::config::HarvestConfig;
use crate::context::WalletSession;
use crate::event::{LogScope, LogSink};
use crate::exchange::{ExchangeClient, PriceCache, SwapResult};
use crate::types::{balance_of, HarvestToken};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// SOL left untouched by every harvest
pub const SOL_RESERVE: f64 = 0.000006;
/// Network fee headroom added to each swap amount
pub const FEE_BUFFER: f64 = 0.000005;
/// Smallest swap the aggregator accepts
pub const MIN_SWAP_SOL: f64 = 0.000001;
/// Below this the wallet is topped up with the primary token
pub const GOVERNANCE_MIN_BALANCE: f64 = 42069.0;
pub const GOVERNANCE_TARGET_BALANCE: f64 = 46920.0;

/// How a firing ended
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    WalletLocked,
    BalanceUnavailable,
    InsufficientReserve,
    InsufficientFunds,
    GovernanceUnaffordable,
    Swapped(SwapResult),
    SwapFailed,
}

#[derive(Clone)]
pub struct Harvester {
    wallet: WalletSession,
    balances: Arc<dyn BalanceReader>,
    exchange: Arc<dyn ExchangeClient>,
    prices: PriceCache,
    sink: LogSink,
    settle_delay: Duration,
    refresh_delay: Duration,
}

impl Harvester {
    pub fn new(
        wallet: WalletSession,
        balances: Arc<dyn BalanceReader>,
        exchange: Arc<dyn ExchangeClient>,
        prices: PriceCache,
        sink: LogSink,
    ) -> Self {
        Self {
            wallet,
            balances,
            exchange,
            prices,
            sink,
            settle_delay: Duration::from_secs(60),
            refresh_delay: Duration::from_secs(60),
        }
    }

    /// Override the post-swap waits
    pub fn with_delays(mut self, settle_delay: Duration, refresh_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self.refresh_delay = refresh_delay;
        self
    }

    pub fn prices(&self) -> &PriceCache {
        &self.prices
    }

    fn log(&self, line: impl Into<String>) {
        self.sink.log(LogScope::Harvest, line);
    }

    /// Ask the UI to re-read balances once the swap has had time to land
    fn schedule_refresh(&self) {
        let sink = self.sink.clone();
        let delay = self.refresh_delay;
        thread::spawn(move || {
            thread::sleep(delay);
            sink.request_refresh();
        });
    }

    /// Run one scheduled harvest with `config`
    pub fn fire_once(&self, config: &HarvestConfig) -> FireOutcome {
        let Some(credentials) = self.wallet.current() else {
            self.log("Wallet is locked, skipping harvest");
            return FireOutcome::WalletLocked;
        };
        let address = credentials.public_key();

        let native = match self.balances.native_balance(address) {
            Ok(native) => native,
            Err(e) => {
                self.log(format!("Error getting SOL balance: {}", e));
                return FireOutcome::BalanceUnavailable;
            }
        };
        let tokens = match self.balances.token_balances(address) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.log(format!("Error getting wallet balances: {}", e));
                return FireOutcome::BalanceUnavailable;
            }
        };

        if native < SOL_RESERVE {
            self.log(format!(
                "Insufficient SOL balance {:.6}. Minimum required: {} SOL",
                native, SOL_RESERVE
            ));
            return FireOutcome::InsufficientReserve;
        }

        if native < config.sol_per_harvest + FEE_BUFFER {
            self.log(format!(
                "Insufficient SOL balance {:.6}. Minimum required: {:.9} SOL",
                native,
                config.sol_per_harvest + FEE_BUFFER
            ));
            return FireOutcome::InsufficientFunds;
        }

        let governance = balance_of(&tokens, HarvestToken::PRIMARY);
        if config.token_to_harvest != HarvestToken::PRIMARY && governance < GOVERNANCE_MIN_BALANCE {
            if let Err(outcome) = self.top_up_governance(native, governance, &credentials) {
                return outcome;
            }
        }

        let amount = config.sol_per_harvest.max(MIN_SWAP_SOL);
        let token = config.token_to_harvest;

        let outcome = match self.exchange.exchange_sol_for_token(amount, token, &credentials) {
            Ok(result) => {
                self.log(format!(
                    "SOL: {} -> {}: {} successfully",
                    amount, token, result.output_amount
                ));
                self.log(format!("Transaction sent: {}", result.signature));
                FireOutcome::Swapped(result)
            }
            Err(e) => {
                self.log(format!("Error: {}", e));
                FireOutcome::SwapFailed
            }
        };

        self.schedule_refresh();
        outcome
    }

    /// Buy enough primary token to reach the governance target. A failed
    /// swap is logged and the firing continues.
    fn top_up_governance(
        &self,
        native: f64,
        held: f64,
        credentials: &crate::wallet::Credentials,
    ) -> Result<(), FireOutcome> {
        let to_buy = GOVERNANCE_TARGET_BALANCE - held;
        let primary = HarvestToken::PRIMARY;

        let cost = match self.prices.sol_cost(to_buy, primary) {
            Ok(cost) => cost,
            Err(e) => {
                self.log(format!("Error calculating SOL amount for {}: {}", primary, e));
                return Err(FireOutcome::GovernanceUnaffordable);
            }
        };

        if native < cost + FEE_BUFFER {
            self.log(format!(
                "Insufficient SOL balance {:.6}. Minimum required: {:.9} SOL",
                native,
                cost + FEE_BUFFER
            ));
            return Err(FireOutcome::GovernanceUnaffordable);
        }

        let cost = cost.max(MIN_SWAP_SOL);
        match self.exchange.exchange_sol_for_token(cost, primary, credentials) {
            Ok(result) => self.log(format!(
                "SOL: {} -> {}: {} successfully for governance purposes",
                cost, primary, result.output_amount
            )),
            Err(e) => self.log(format!("Error buying {}: {}", primary, e)),
        }

        thread::sleep(self.settle_delay);
        Ok(())
    }

    /// One-shot swap from the manual form. `amount` is the raw field text.
    pub fn manual(&self, amount: &str, token: HarvestToken) -> FireOutcome {
        let Some(credentials) = self.wallet.current() else {
            self.log("Unlock a wallet first");
            return FireOutcome::WalletLocked;
        };

        let sol = match amount.trim().parse::<f64>() {
            Ok(sol) if sol.is_finite() && sol > 0.0 => sol,
            _ => {
                self.log(format!("Invalid SOL amount: {}", amount));
                return FireOutcome::InsufficientFunds;
            }
        };

        let native = match self.balances.native_balance(credentials.public_key()) {
            Ok(native) => native,
            Err(e) => {
                self.log(format!("Error getting SOL balance: {}", e));
                return FireOutcome::BalanceUnavailable;
            }
        };

        if native <= SOL_RESERVE {
            self.log(format!("Insufficient SOL balance. Minimum required: {} SOL", SOL_RESERVE));
            return FireOutcome::InsufficientReserve;
        }

        self.log(format!("SOL: {} for {}", sol, token));

        match self.exchange.exchange_sol_for_token(sol, token, &credentials) {
            Ok(result) => {
                self.log(format!(
                    "SOL: {} -> {}: {} successfully",
                    sol, token, result.output_amount
                ));
                self.schedule_refresh();
                FireOutcome::Swapped(result)
            }
            Err(e) => {
                self.log(format!("Error: {}", e));
                FireOutcome::SwapFailed
            }
        }
    }

    /// Manual harvest off the UI thread
    pub fn spawn_manual(&self, amount: String, token: HarvestToken) -> thread::JoinHandle<FireOutcome> {
        let this = self.clone();
        thread::spawn(move || this.manual(&amount, token))
    }

    /// "Amount(Est.)" text for the manual form
    pub fn estimate(&self, amount: &str, token: HarvestToken) -> String {
        let sol = match amount.trim().parse::<f64>() {
            Ok(sol) if sol > 0.0 => sol,
            _ => return "-".to_string(),
        };
        match self.prices.estimate_tokens(sol, token) {
            Ok(tokens) => format!("{:.2} {}", tokens, token),
            Err(e) => {
                tracing::debug!("[Harvester] Estimate unavailable: {}", e);
                "-".to_string()
            }
        }
    }
}
