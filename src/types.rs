// xoon Type Definitions
//
// Shared token identifiers, balances and unit constants
// used by the chain, exchange and harvest modules.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Tokens the harvest loop can buy. The closed set doubles as the
/// balance allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HarvestToken {
    SolXen,
    Xencat,
    Pv,
    Ore,
}

static MINTS: Lazy<HashMap<&'static str, HarvestToken>> = Lazy::new(|| {
    HarvestToken::ALL.iter().map(|t| (t.mint(), *t)).collect()
});

impl HarvestToken {
    pub const ALL: [HarvestToken; 4] = [
        HarvestToken::SolXen,
        HarvestToken::Xencat,
        HarvestToken::Pv,
        HarvestToken::Ore,
    ];

    /// The reward token, subject to the auxiliary purchase rule
    pub const PRIMARY: HarvestToken = HarvestToken::SolXen;

    pub fn symbol(self) -> &'static str {
        match self {
            HarvestToken::SolXen => "solXEN",
            HarvestToken::Xencat => "xencat",
            HarvestToken::Pv => "PV",
            HarvestToken::Ore => "ORE",
        }
    }

    pub fn mint(self) -> &'static str {
        match self {
            HarvestToken::SolXen => "6f8deE148nynnSiWshA9vLydEbJGpDeKh5G4PRgjmzG7",
            HarvestToken::Xencat => "7UN8WkBumTUCofVPXCPjNWQ6msQhzrg9tFQRP48Nmw5V",
            HarvestToken::Pv => "5px3a5LWR6CmiYX3ktpNnGYiEypfDdemRd74GDYbsJ2H",
            HarvestToken::Ore => "oreoU2P8bN6jkk3jbaiVxYnG1dCXcYxwhwyK9jSybcp",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.symbol() == symbol)
    }

    pub fn from_mint(mint: &str) -> Option<Self> {
        MINTS.get(mint).copied()
    }
}

/// Unknown symbols in a stored config fall back to the reward token
impl From<String> for HarvestToken {
    fn from(symbol: String) -> Self {
        HarvestToken::from_symbol(&symbol).unwrap_or(HarvestToken::PRIMARY)
    }
}

impl From<HarvestToken> for String {
    fn from(token: HarvestToken) -> Self {
        token.symbol().to_string()
    }
}

impl fmt::Display for HarvestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One SPL token holding, in display units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub mint: String,
    pub symbol: String,
    pub amount: f64,
}

impl TokenBalance {
    pub fn zero(token: HarvestToken) -> Self {
        Self {
            mint: token.mint().to_string(),
            symbol: token.symbol().to_string(),
            amount: 0.0,
        }
    }
}

/// Balance of `token` within a balance list, zero when absent
pub fn balance_of(balances: &[TokenBalance], token: HarvestToken) -> f64 {
    balances
        .iter()
        .filter(|b| b.mint == token.mint())
        .map(|b| b.amount)
        .sum()
}
