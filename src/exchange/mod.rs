// Exchange Module - SOL to token swaps
//
// This module quotes, builds and submits swaps through the aggregator,
// and caches prices for local estimates

pub mod jupiter;
pub mod price;

pub use jupiter::JupiterClient;
pub use price::{start_price_refresher, PriceCache, PriceSource, PRICE_REFRESH_INTERVAL};

use crate::error::ExchangeError;
use crate::types::HarvestToken;
use crate::wallet::Credentials;
use serde_json::Value;

/// Output amounts are reported in units of 10^6 base units
pub const OUTPUT_SCALE: f64 = 1_000_000.0;

/// A quote as returned by the aggregator. `raw` is echoed back on swap.
#[derive(Debug, Clone)]
pub struct ExchangeQuote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub slippage_bps: u32,
    pub price_impact_pct: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapResult {
    pub output_amount: f64,
    pub signature: String,
}

/// Swap backend used by the harvest scheduler
pub trait ExchangeClient: Send + Sync {
    fn quote(&self, sol_amount: f64, token: HarvestToken) -> Result<ExchangeQuote, ExchangeError>;

    /// Build, sign and broadcast the swap for `quote`; returns the signature
    fn swap(&self, quote: &ExchangeQuote, credentials: &Credentials) -> Result<String, ExchangeError>;

    fn exchange_sol_for_token(
        &self,
        sol_amount: f64,
        token: HarvestToken,
        credentials: &Credentials,
    ) -> Result<SwapResult, ExchangeError> {
        let quote = self.quote(sol_amount, token)?;
        let signature = self.swap(&quote, credentials)?;
        Ok(SwapResult {
            output_amount: quote.out_amount as f64 / OUTPUT_SCALE,
            signature,
        })
    }
}
