// Solana RPC Client
//
// Native and SPL token balances for the dashboard and the harvest
// gates, and submission of signed swap transactions.
//

use crate::error::ChainError;
use crate::types::{HarvestToken, TokenBalance, LAMPORTS_PER_SOL};
use serde_json::Value;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";
pub const TOKEN_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SEND_ATTEMPTS: u32 = 2;
const SEND_RETRY_DELAY: Duration = Duration::from_secs(2);

/// On-chain balance queries
pub trait BalanceReader: Send + Sync {
    /// SOL balance of `address`
    fn native_balance(&self, address: &str) -> Result<f64, ChainError>;

    /// Allow-listed token holdings; never empty
    fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, ChainError>;
}

/// Broadcast of a fully signed transaction
pub trait TransactionSender: Send + Sync {
    /// Returns the transaction signature
    fn send_transaction(&self, signed_tx: &VersionedTransaction) -> Result<String, ChainError>;
}

#[derive(Clone)]
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    send_attempts: u32,
    retry_delay: Duration,
}

impl SolanaRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout(url.into(), REQUEST_TIMEOUT)),
            send_attempts: SEND_ATTEMPTS,
            retry_delay: SEND_RETRY_DELAY,
        }
    }

    pub fn mainnet() -> Self {
        Self::new(MAINNET_RPC)
    }
}

fn parse_address(address: &str) -> Result<Pubkey, ChainError> {
    Pubkey::from_str(address).map_err(|e| ChainError::InvalidAddress(format!("{}: {}", address, e)))
}

impl BalanceReader for SolanaRpc {
    fn native_balance(&self, address: &str) -> Result<f64, ChainError> {
        let owner = parse_address(address)?;
        let lamports = self.client.get_balance(&owner)?;
        let sol = lamports as f64 / LAMPORTS_PER_SOL;
        tracing::debug!("[SolanaRpc] SOL balance of {}: {}", address, sol);
        Ok(sol)
    }

    fn token_balances(&self, address: &str) -> Result<Vec<TokenBalance>, ChainError> {
        let owner = parse_address(address)?;
        let accounts = self
            .client
            .get_token_accounts_by_owner(&owner, TokenAccountsFilter::ProgramId(TOKEN_PROGRAM_ID))?;

        // jsonParsed account data is kept as JSON by the client types
        let value = serde_json::to_value(&accounts)
            .map_err(|e| ChainError::InvalidResponse(format!("token accounts: {}", e)))?;

        let balances = parse_token_accounts(&value);
        let symbols: Vec<&str> = balances.iter().map(|b| b.symbol.as_str()).collect();
        tracing::debug!("[SolanaRpc] Fetched balances for tokens: {}", symbols.join(", "));
        Ok(balances)
    }
}

impl TransactionSender for SolanaRpc {
    fn send_transaction(&self, signed_tx: &VersionedTransaction) -> Result<String, ChainError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.client.send_transaction(signed_tx) {
                Ok(signature) => {
                    tracing::info!("[SolanaRpc] Transaction sent: {}", signature);
                    return Ok(signature.to_string());
                }
                Err(e) if attempt < self.send_attempts => {
                    tracing::warn!(
                        "[SolanaRpc] sendTransaction attempt {}/{} failed: {}",
                        attempt,
                        self.send_attempts,
                        e
                    );
                    thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Allow-listed holdings from a jsonParsed getTokenAccountsByOwner value.
/// Falls back to a single zero solXEN entry.
pub fn parse_token_accounts(value: &Value) -> Vec<TokenBalance> {
    let mut balances: Vec<TokenBalance> = value
        .as_array()
        .map(|accounts| accounts.iter().filter_map(parse_account).collect())
        .unwrap_or_default();

    if balances.is_empty() {
        tracing::debug!("[SolanaRpc] No tracked tokens held, returning placeholder");
        balances.push(TokenBalance::zero(HarvestToken::PRIMARY));
    }
    balances
}

fn parse_account(account: &Value) -> Option<TokenBalance> {
    let info = account.pointer("/account/data/parsed/info")?;
    let token = HarvestToken::from_mint(info.get("mint")?.as_str()?)?;

    let amount = info.pointer("/tokenAmount/amount")?.as_str()?.parse::<f64>().ok()?;
    let decimals = info.pointer("/tokenAmount/decimals")?.as_i64()?;

    Some(TokenBalance {
        mint: token.mint().to_string(),
        symbol: token.symbol().to_string(),
        amount: amount / 10f64.powi(decimals as i32),
    })
}
