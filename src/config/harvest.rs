// Harvest Config
//
// solXENconfig.json beside the executable. Re-read at the top of every
// scheduler cycle so edits apply without a restart.
//

use crate::error::ConfigError;
use crate::types::HarvestToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_FILE_NAME: &str = "solXENconfig.json";

/// Persisted auto-harvest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestConfig {
    pub sol_per_harvest: f64,
    pub token_to_harvest: HarvestToken,
    /// Kept as written so an unknown value survives a round trip; the
    /// scheduler decides what it means.
    pub harvest_interval: String,
    /// Reserved, not acted on
    #[serde(default = "default_burn")]
    pub harvest_burn: String,
}

fn default_burn() -> String {
    "Off".to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sol_per_harvest: 0.001,
            token_to_harvest: HarvestToken::SolXen,
            harvest_interval: HarvestInterval::Off.as_str().to_string(),
            harvest_burn: default_burn(),
        }
    }
}

impl HarvestConfig {
    pub fn interval(&self) -> Result<HarvestInterval, UnknownInterval> {
        self.harvest_interval.parse()
    }

    pub fn set_interval(&mut self, interval: HarvestInterval) {
        self.harvest_interval = interval.as_str().to_string();
    }
}

/// Auto-harvest cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestInterval {
    Off,
    TenMinutes,
    OneHour,
    OneDay,
}

impl HarvestInterval {
    pub const ALL: [HarvestInterval; 4] = [
        HarvestInterval::Off,
        HarvestInterval::TenMinutes,
        HarvestInterval::OneHour,
        HarvestInterval::OneDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HarvestInterval::Off => "Off",
            HarvestInterval::TenMinutes => "10m",
            HarvestInterval::OneHour => "1h",
            HarvestInterval::OneDay => "1d",
        }
    }
}

impl fmt::Display for HarvestInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownInterval(pub String);

impl FromStr for HarvestInterval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HarvestInterval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| UnknownInterval(s.to_string()))
    }
}

/// Read the config, creating the default record when the file is absent
pub fn read_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    if !path.exists() {
        let config = HarvestConfig::default();
        write_config(path, &config)?;
        tracing::info!("[HarvestConfig] Created default config at {:?}", path);
        return Ok(config);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(serde_json::from_str(&contents)?)
}

/// Write the config with pretty formatting
pub fn write_config(path: &Path, config: &HarvestConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json_str = serde_json::to_string_pretty(config)?;
    fs::write(path, json_str).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("[HarvestConfig] Saved {:?}", path);
    Ok(())
}
