// Price Cache
//
// How many of each harvest token one SOL buys, refreshed from the
// aggregator every 30 minutes. Estimates never hit the network.
//

use crate::error::ExchangeError;
use crate::event::{LogSink, UiEvent};
use crate::types::HarvestToken;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const PRICE_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Source of fresh prices (tokens per SOL)
pub trait PriceSource: Send + Sync {
    fn fetch_price(&self, token: HarvestToken) -> Result<f64, ExchangeError>;
}

#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    prices: Arc<Mutex<HashMap<HarvestToken, f64>>>,
}

impl PriceCache {
    pub fn set(&self, token: HarvestToken, price: f64) {
        self.prices.lock().unwrap().insert(token, price);
    }

    /// Cached price, if one above zero is known
    pub fn get(&self, token: HarvestToken) -> Option<f64> {
        self.prices
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .filter(|p| *p > 0.0)
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.prices
            .lock()
            .unwrap()
            .iter()
            .map(|(token, price)| (token.symbol().to_string(), *price))
            .collect()
    }

    /// Tokens received for `sol`
    pub fn estimate_tokens(&self, sol: f64, token: HarvestToken) -> Result<f64, ExchangeError> {
        let price = self.require(token)?;
        Ok(sol * price)
    }

    /// SOL needed to buy `amount` of `token`
    pub fn sol_cost(&self, amount: f64, token: HarvestToken) -> Result<f64, ExchangeError> {
        let price = self.require(token)?;
        Ok(amount / price)
    }

    fn require(&self, token: HarvestToken) -> Result<f64, ExchangeError> {
        self.get(token)
            .ok_or_else(|| ExchangeError::PriceUnavailable(token.symbol().to_string()))
    }

    /// Fetch every token's price. A failed fetch drops the cached value,
    /// so nothing is sized from a stale price.
    pub fn refresh(&self, source: &dyn PriceSource) -> usize {
        let mut updated = 0;
        for token in HarvestToken::ALL {
            match source.fetch_price(token) {
                Ok(price) => {
                    tracing::info!("[PriceCache] Fetched price for {}: {}", token, price);
                    self.set(token, price);
                    updated += 1;
                }
                Err(e) => {
                    tracing::warn!("[PriceCache] Failed to fetch price for {}: {}", token, e);
                    self.prices.lock().unwrap().remove(&token);
                }
            }
        }
        updated
    }
}

/// Start price refresh thread: once now, then every `interval`
pub fn start_price_refresher(
    cache: PriceCache,
    source: Arc<dyn PriceSource>,
    sink: LogSink,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let updated = cache.refresh(source.as_ref());
        tracing::debug!("[PriceCache] Refreshed {} prices", updated);
        sink.send(UiEvent::Prices(cache.snapshot()));
        thread::sleep(interval);
    })
}
