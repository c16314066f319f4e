// Jupiter Aggregator Client
//
// Quote and swap endpoints for SOL -> token swaps, plus the price
// endpoint feeding the price cache. The swap transaction comes back
// unsigned; it is signed locally and broadcast over RPC.
//

use super::price::PriceSource;
use super::{ExchangeClient, ExchangeQuote};
use crate::chain::TransactionSender;
use crate::error::ExchangeError;
use crate::types::{HarvestToken, LAMPORTS_PER_SOL, SOL_MINT};
use crate::wallet::Credentials;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;

pub const QUOTE_URL: &str = "https://quote-api.jup.ag/v6/quote";
pub const SWAP_URL: &str = "https://quote-api.jup.ag/v6/swap";
pub const PRICE_URL: &str = "https://api.jup.ag/price/v2";
pub const SLIPPAGE_BPS: u32 = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteBody {
    input_mint: String,
    in_amount: String,
    output_mint: String,
    out_amount: String,
    #[serde(default)]
    slippage_bps: u32,
    #[serde(default)]
    price_impact_pct: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapBody {
    swap_transaction: Option<String>,
    error: Option<String>,
}

pub struct JupiterClient {
    client: Client,
    sender: Arc<dyn TransactionSender>,
    quote_url: String,
    swap_url: String,
    price_url: String,
}

impl JupiterClient {
    pub fn new(sender: Arc<dyn TransactionSender>) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            sender,
            quote_url: QUOTE_URL.to_string(),
            swap_url: SWAP_URL.to_string(),
            price_url: PRICE_URL.to_string(),
        })
    }
}

impl ExchangeClient for JupiterClient {
    fn quote(&self, sol_amount: f64, token: HarvestToken) -> Result<ExchangeQuote, ExchangeError> {
        let lamports = sol_to_lamports(sol_amount)?;
        tracing::info!(
            "[Jupiter] Requesting quote: {} SOL ({} lamports) -> {}",
            sol_amount,
            lamports,
            token
        );

        let raw: Value = self
            .client
            .get(&self.quote_url)
            .query(&[
                ("inputMint", SOL_MINT.to_string()),
                ("outputMint", token.mint().to_string()),
                ("amount", lamports.to_string()),
                ("slippageBps", SLIPPAGE_BPS.to_string()),
            ])
            .send()?
            .json()?;

        let quote = parse_quote(raw)?;
        tracing::debug!("[Jupiter] Quote response: {}", quote.raw);
        Ok(quote)
    }

    fn swap(&self, quote: &ExchangeQuote, credentials: &Credentials) -> Result<String, ExchangeError> {
        let request = json!({
            "quoteResponse": quote.raw,
            "userPublicKey": credentials.public_key(),
            "wrapAndUnwrapSOL": true,
            "prioritizationFeeLamports": "auto",
        });

        let body: Value = self.client.post(&self.swap_url).json(&request).send()?.json()?;
        let tx = decode_transaction(&swap_transaction(&body)?)?;

        let signed = credentials.sign_transaction(tx)?;
        Ok(self.sender.send_transaction(&signed)?)
    }
}

impl PriceSource for JupiterClient {
    fn fetch_price(&self, token: HarvestToken) -> Result<f64, ExchangeError> {
        tracing::debug!("[Jupiter] Fetching price for {}", token);
        let body: Value = self
            .client
            .get(&self.price_url)
            .query(&[("ids", SOL_MINT), ("vsToken", token.mint())])
            .send()?
            .json()?;
        parse_price(&body)
    }
}

fn sol_to_lamports(sol_amount: f64) -> Result<u64, ExchangeError> {
    if !sol_amount.is_finite() || sol_amount <= 0.0 {
        return Err(ExchangeError::InvalidAmount(sol_amount.to_string()));
    }
    Ok((sol_amount * LAMPORTS_PER_SOL).round() as u64)
}

fn parse_quote(raw: Value) -> Result<ExchangeQuote, ExchangeError> {
    if let Some(error) = raw.get("error").and_then(Value::as_str) {
        return Err(ExchangeError::Api(error.to_string()));
    }

    let body: QuoteBody = serde_json::from_value(raw.clone())
        .map_err(|e| ExchangeError::InvalidResponse(format!("quote: {}", e)))?;

    let amount = |s: &str| {
        s.parse::<u64>()
            .map_err(|_| ExchangeError::InvalidResponse(format!("bad amount in quote: {:?}", s)))
    };

    Ok(ExchangeQuote {
        in_amount: amount(&body.in_amount)?,
        out_amount: amount(&body.out_amount)?,
        input_mint: body.input_mint,
        output_mint: body.output_mint,
        slippage_bps: body.slippage_bps,
        price_impact_pct: body.price_impact_pct,
        raw,
    })
}

fn swap_transaction(body: &Value) -> Result<String, ExchangeError> {
    let parsed: SwapBody = serde_json::from_value(body.clone())
        .map_err(|e| ExchangeError::InvalidResponse(format!("swap: {}", e)))?;

    match (parsed.swap_transaction, parsed.error) {
        (Some(tx), _) if !tx.is_empty() => Ok(tx),
        (_, Some(error)) => {
            tracing::warn!("[Jupiter] Raw swap response: {}", body);
            Err(ExchangeError::Api(error))
        }
        _ => Err(ExchangeError::InvalidResponse("swap response has no transaction".into())),
    }
}

/// Base64 of a bincode-serialized versioned transaction
fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, ExchangeError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| ExchangeError::InvalidResponse(format!("failed to decode transaction: {}", e)))?;
    tracing::debug!("[Jupiter] Decoded transaction length: {} bytes", bytes.len());
    if bytes.is_empty() {
        return Err(ExchangeError::InvalidResponse("decoded transaction is empty".into()));
    }

    bincode::deserialize(&bytes)
        .map_err(|e| ExchangeError::InvalidResponse(format!("failed to parse transaction: {}", e)))
}

/// `data[SOL_MINT].price` is a decimal string
fn parse_price(body: &Value) -> Result<f64, ExchangeError> {
    let price = body
        .get("data")
        .and_then(|data| data.get(SOL_MINT))
        .and_then(|entry| entry.get("price"))
        .ok_or_else(|| ExchangeError::InvalidResponse("price missing from response".into()))?;

    let value = match price {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    value.ok_or_else(|| ExchangeError::InvalidResponse(format!("bad price: {}", price)))
}
