// Application Context
//
// Paths and the unlocked wallet session, owned by main and handed to
// every component that needs them.
//

use crate::config::CONFIG_FILE_NAME;
use crate::event::LogSink;
use crate::wallet::{Credentials, WalletStore};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Overrides the executable directory, for development runs
pub const HOME_ENV: &str = "XOON_HOME";

/// Everything lives beside the executable
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_executable() -> io::Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Ok(Self::new(home));
        }

        let exe = std::env::current_exe()?;
        let root = exe.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory")
        })?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn wallet_dir(&self) -> PathBuf {
        self.root.join("wallet")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("debug.log")
    }

    /// Install directory of a miner backend
    pub fn miner_dir(&self, dir_name: &str) -> PathBuf {
        self.root.join(dir_name)
    }
}

/// The unlocked wallet, if any. Cleared on logout and exit.
#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    inner: Arc<Mutex<Option<Arc<Credentials>>>>,
}

impl WalletSession {
    pub fn unlock(&self, credentials: Credentials) {
        *self.inner.lock().unwrap() = Some(Arc::new(credentials));
    }

    /// Drop the session's keys. In-flight users keep theirs until done.
    pub fn logout(&self) {
        self.inner.lock().unwrap().take();
    }

    pub fn current(&self) -> Option<Arc<Credentials>> {
        self.inner.lock().unwrap().clone()
    }

    pub fn public_key(&self) -> Option<String> {
        self.current().map(|c| c.public_key().to_string())
    }

    pub fn is_unlocked(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }
}

/// Shared handles injected into supervisors, the scheduler and the UI
#[derive(Debug, Clone)]
pub struct AppContext {
    pub paths: AppPaths,
    pub wallet: WalletSession,
    pub store: WalletStore,
    pub sink: LogSink,
}

impl AppContext {
    pub fn new(paths: AppPaths, sink: LogSink) -> Self {
        let store = WalletStore::new(paths.wallet_dir());
        Self {
            paths,
            wallet: WalletSession::default(),
            store,
            sink,
        }
    }
}
