// Miner Backends
//
// Each supported mining executable described as data: where it lives,
// its command-line dialect, and its algorithm-to-pool lookup table.
// The supervisor is the same for all of them.
//

use crate::context::AppPaths;
use crate::event::LogScope;
use std::path::PathBuf;

/// Pool user suffix identifying the referral on unMineable
const REFERRAL_TAG: &str = "plxp-imd8";
const POOL_DOMAIN: &str = "unmineable.com";

/// One selectable algorithm and the pool subdomain that serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Algorithm {
    pub label: &'static str,
    pub id: &'static str,
    pub host: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Backend {
    pub name: &'static str,
    pub scope: LogScope,
    /// Install directory beside the executable
    pub dir_name: &'static str,
    pub exe_unix: &'static str,
    pub exe_windows: &'static str,
    /// Substring matched against process names and command lines on stop
    pub kill_pattern: &'static str,
    /// Placeholders: {algo} {threads} {pool} {user}
    pub args: &'static [&'static str],
    pub algorithms: &'static [Algorithm],
    pub default_algorithm: &'static str,
    pub ports: &'static [u16],
    pub ssl_ports: &'static [u16],
    pub uses_threads: bool,
}

pub static XMRIG: Backend = Backend {
    name: "xmrig",
    scope: LogScope::Cpu,
    dir_name: "xmrigMiner",
    exe_unix: "xmrig-6.22.0/xmrig",
    exe_windows: "xmrig-6.22.0\\xmrig.exe",
    kill_pattern: "xmrig",
    args: &["-a", "{algo}", "-t", "{threads}", "-o", "{pool}", "-u", "{user}", "-p", "x"],
    algorithms: &[
        Algorithm { label: "GhostRider", id: "gr", host: "ghostrider" },
        Algorithm { label: "RandomX", id: "rx", host: "rx" },
    ],
    default_algorithm: "GhostRider",
    ports: &[443, 3333, 13333, 80],
    ssl_ports: &[443],
    uses_threads: true,
};

pub static SRBMINER: Backend = Backend {
    name: "SRBMiner-Multi",
    scope: LogScope::AmdGpu,
    dir_name: "srbMiner",
    exe_unix: "SRBMiner-Multi-2-6-6/SRBMiner-MULTI",
    exe_windows: "SRBMiner-Multi-2-6-6\\SRBMiner-MULTI.exe",
    kill_pattern: "SRBMiner-MULTI",
    args: &["--algorithm", "{algo}", "--disable-cpu", "--pool", "{pool}", "--wallet", "{user}"],
    algorithms: &[
        Algorithm { label: "FishHash (GPU>6GB)", id: "fishhash", host: "fishhash" },
        Algorithm { label: "Blake3 (GPU>4GB)", id: "blake3_alephium", host: "blake3" },
        Algorithm { label: "KarlsenHash (GPU>3GB)", id: "karlsenhashv2", host: "karlsenhash" },
    ],
    default_algorithm: "Blake3 (GPU>4GB)",
    ports: &[4444, 443, 3333, 13333, 80],
    ssl_ports: &[443, 4444],
    uses_threads: false,
};

pub static LOLMINER: Backend = Backend {
    name: "lolMiner",
    scope: LogScope::NvidiaGpu,
    dir_name: "lolMiner",
    exe_unix: "1.91/lolMiner",
    exe_windows: "1.91\\lolMiner.exe",
    kill_pattern: "lolMiner",
    args: &["--algo", "{algo}", "--pool", "{pool}", "--user", "{user}"],
    algorithms: &[
        Algorithm { label: "KarlsenHash (GPU>3GB)", id: "KARLSENV2", host: "karlsenhash" },
        Algorithm { label: "Blake3 (GPU>4GB)", id: "ALEPH", host: "blake3" },
        Algorithm { label: "Etchash (GPU>4GB)", id: "ETCHASH", host: "etchash" },
        Algorithm { label: "FishHash (GPU>6GB)", id: "FISHHASH", host: "fishhash" },
        Algorithm { label: "BeamHash (GPU>6GB)", id: "BEAM-III", host: "beamhash" },
        Algorithm { label: "Ethash (GPU>6GB)", id: "ETHASH", host: "ethash" },
    ],
    default_algorithm: "FishHash (GPU>6GB)",
    ports: &[4444, 443, 3333, 13333, 80],
    ssl_ports: &[443, 4444],
    uses_threads: false,
};

pub static BACKENDS: [&Backend; 3] = [&XMRIG, &SRBMINER, &LOLMINER];

/// User choices from a miner form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningParams {
    pub algorithm: String,
    pub port: u16,
    pub worker: String,
    pub threads: usize,
}

/// A fully resolved command line, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
}

impl Backend {
    /// Unknown labels resolve to the backend default
    pub fn algorithm(&self, label: &str) -> Algorithm {
        self.algorithms
            .iter()
            .find(|a| a.label == label)
            .or_else(|| self.algorithms.iter().find(|a| a.label == self.default_algorithm))
            .copied()
            .unwrap_or(self.algorithms[0])
    }

    pub fn pool_address(&self, algorithm: &Algorithm, port: u16) -> String {
        let address = format!("{}.{}:{}", algorithm.host, POOL_DOMAIN, port);
        if self.ssl_ports.contains(&port) {
            format!("stratum+ssl://{}", address)
        } else {
            address
        }
    }

    pub fn default_params(&self) -> MiningParams {
        MiningParams {
            algorithm: self.default_algorithm.to_string(),
            port: self.ports[0],
            worker: "xoon".to_string(),
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    pub fn executable_name(&self) -> &'static str {
        if cfg!(windows) {
            self.exe_windows
        } else {
            self.exe_unix
        }
    }

    pub fn launch_spec(&self, paths: &AppPaths, public_key: &str, params: &MiningParams) -> LaunchSpec {
        let algorithm = self.algorithm(&params.algorithm);
        let pool = self.pool_address(&algorithm, params.port);
        let user = format!("SOL:{}.{}#{}", public_key, params.worker, REFERRAL_TAG);
        let threads = params.threads.to_string();

        let args = self
            .args
            .iter()
            .map(|arg| match *arg {
                "{algo}" => algorithm.id.to_string(),
                "{threads}" => threads.clone(),
                "{pool}" => pool.clone(),
                "{user}" => user.clone(),
                other => other.to_string(),
            })
            .collect();

        let work_dir = paths.miner_dir(self.dir_name);
        LaunchSpec {
            executable: work_dir.join(self.executable_name()),
            args,
            work_dir,
        }
    }
}
