// unMineable Pool Statistics
//
// Two lookups: the address endpoint gives pending balance, payout
// threshold and the account uuid; the account stats endpoint gives
// recent rewards. Stats are best effort and may be missing.
//

use crate::error::PoolError;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const API_BASE: &str = "https://api.unminable.com/v4";
pub const POOL_COIN: &str = "SOL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Dashboard view of the miner's pool account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    pub coin: String,
    pub balance: f64,
    pub payment_threshold: f64,
    pub auto_pay: bool,
    pub network: String,
    pub rewards_24h: Option<f64>,
    pub rewards_7d: Option<f64>,
    pub rewards_30d: Option<f64>,
}

pub trait PoolStatsSource: Send + Sync {
    fn fetch_stats(&self, address: &str) -> Result<PoolStats, PoolError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct AddressData {
    #[serde(default)]
    balance: Value,
    #[serde(default)]
    payment_threshold: Value,
    #[serde(default)]
    auto: bool,
    #[serde(default)]
    network: String,
    #[serde(default)]
    uuid: Option<String>,
}

pub struct UnmineableClient {
    client: Client,
    base_url: String,
}

impl UnmineableClient {
    pub fn new() -> Result<Self, PoolError> {
        Self::with_base_url(API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, PoolError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn account_rewards(&self, uuid: &str) -> Result<Rewards, PoolError> {
        let url = format!("{}/account/{}/stats", self.base_url, uuid);
        let body: Value = self.client.get(url).send()?.json()?;
        Ok(parse_rewards(&body))
    }
}

impl PoolStatsSource for UnmineableClient {
    fn fetch_stats(&self, address: &str) -> Result<PoolStats, PoolError> {
        let url = format!("{}/address/{}", self.base_url, address);
        let body: Value = self
            .client
            .get(url)
            .query(&[("coin", POOL_COIN)])
            .send()?
            .json()?;
        tracing::debug!("[Unmineable] Address response: {}", body);

        let (mut stats, uuid) = parse_address(body)?;

        if let Some(uuid) = uuid {
            match self.account_rewards(&uuid) {
                Ok(rewards) => rewards.apply(&mut stats),
                Err(e) => tracing::warn!("[Unmineable] Failed to fetch account stats: {}", e),
            }
        }
        Ok(stats)
    }
}

fn parse_address(body: Value) -> Result<(PoolStats, Option<String>), PoolError> {
    let envelope: Envelope<AddressData> = serde_json::from_value(body)
        .map_err(|e| PoolError::InvalidResponse(e.to_string()))?;

    if envelope.success == Some(false) {
        let msg = envelope.msg.unwrap_or_else(|| "request rejected".into());
        return Err(PoolError::InvalidResponse(msg));
    }
    let data = envelope
        .data
        .ok_or_else(|| PoolError::InvalidResponse("missing data".into()))?;

    let stats = PoolStats {
        coin: POOL_COIN.to_string(),
        balance: number(&data.balance).unwrap_or(0.0),
        payment_threshold: number(&data.payment_threshold).unwrap_or(0.0),
        auto_pay: data.auto,
        network: data.network,
        ..PoolStats::default()
    };
    Ok((stats, data.uuid))
}

#[derive(Debug, Default, PartialEq)]
struct Rewards {
    past_24h: Option<f64>,
    past_7d: Option<f64>,
    past_30d: Option<f64>,
}

impl Rewards {
    fn apply(self, stats: &mut PoolStats) {
        stats.rewards_24h = self.past_24h;
        stats.rewards_7d = self.past_7d;
        stats.rewards_30d = self.past_30d;
    }
}

/// Reward totals sit under `data.rewards` or directly under `data`,
/// keyed `past_24h` or `past24h` depending on API version
fn parse_rewards(body: &Value) -> Rewards {
    let data = body.get("data").unwrap_or(&Value::Null);
    let scope = data.get("rewards").unwrap_or(data);

    let pick = |keys: &[&str]| keys.iter().find_map(|k| scope.get(*k).and_then(number));

    Rewards {
        past_24h: pick(&["past_24h", "past24h"]),
        past_7d: pick(&["past_7d", "past7d"]),
        past_30d: pick(&["past_30d", "past30d"]),
    }
}

/// Amounts come as strings or numbers
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_address_response() {
        let body = json!({
            "success": true,
            "msg": "Ok",
            "data": {
                "balance": "0.01234",
                "balance_payable": "0.01234",
                "payment_threshold": "0.1",
                "auto": true,
                "network": "SOL",
                "uuid": "6b1c-uuid"
            }
        });

        let (stats, uuid) = parse_address(body).unwrap();
        assert_eq!(stats.balance, 0.01234);
        assert_eq!(stats.payment_threshold, 0.1);
        assert!(stats.auto_pay);
        assert_eq!(stats.network, "SOL");
        assert_eq!(uuid.as_deref(), Some("6b1c-uuid"));
        assert_eq!(stats.rewards_24h, None);
    }

    #[test]
    fn test_rejected_address() {
        let err = parse_address(json!({ "success": false, "msg": "Invalid address" })).unwrap_err();
        assert!(err.to_string().contains("Invalid address"));
    }

    #[test]
    fn test_parse_rewards_layouts() {
        let nested = json!({ "data": { "rewards": { "past_24h": "0.002", "past_7d": 0.014, "past_30d": "0.06" } } });
        assert_eq!(
            parse_rewards(&nested),
            Rewards {
                past_24h: Some(0.002),
                past_7d: Some(0.014),
                past_30d: Some(0.06),
            }
        );

        let flat = json!({ "data": { "past24h": "1.5" } });
        let rewards = parse_rewards(&flat);
        assert_eq!(rewards.past_24h, Some(1.5));
        assert_eq!(rewards.past_30d, None);

        assert_eq!(parse_rewards(&json!({})), Rewards::default());
    }
}
