// Wallet Store
//
// One encrypted wallet file per install under <root>/wallet, named
// <first 8 chars of the address>.solXENwallet.
//

use super::crypto;
use super::signer::Credentials;
use crate::error::WalletError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const WALLET_EXTENSION: &str = "solXENwallet";
pub const MIN_PASSWORD_LEN: usize = 8;
pub const PUBLIC_EXPORT_FILE: &str = "solXEN-public-key-exported.json";
pub const PRIVATE_EXPORT_FILE: &str = "solXEN-private-key-exported.json";

/// Decrypted wallet file contents
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct WalletPayload {
    password: String,
    public_key: String,
    /// base64 of the 64-byte keypair
    private_key: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { public_key: String, path: PathBuf },
    /// A wallet already exists; it is never overwritten
    Existing { prefix: String, path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct WalletStore {
    dir: PathBuf,
}

impl WalletStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First *.solXENwallet file in the wallet directory
    pub fn find_wallet_file(&self) -> Option<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == WALLET_EXTENSION))
            .collect();
        files.sort();
        files.into_iter().next()
    }

    /// Address prefix of the existing wallet, from its file name
    pub fn existing_prefix(&self) -> Option<String> {
        self.find_wallet_file()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
    }

    pub fn create(&self, password: &str, confirm: &str) -> Result<CreateOutcome, WalletError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(WalletError::PasswordTooShort { min: MIN_PASSWORD_LEN });
        }
        if password != confirm {
            return Err(WalletError::PasswordMismatch);
        }

        if let Some(path) = self.find_wallet_file() {
            let prefix = self.existing_prefix().unwrap_or_default();
            tracing::info!("[WalletStore] Wallet {} already exists, not overwriting", prefix);
            return Ok(CreateOutcome::Existing { prefix, path });
        }

        let signing_key = SigningKey::generate(&mut OsRng);
        let credentials = Credentials::new(signing_key, password);
        let public_key = credentials.public_key().to_string();

        let payload = WalletPayload {
            password: password.to_string(),
            public_key: public_key.clone(),
            private_key: BASE64.encode(credentials.keypair_bytes().as_slice()),
        };
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(&payload)?);
        let sealed = crypto::encrypt(&plaintext, password);

        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}.{}", &public_key[..8], WALLET_EXTENSION));
        write_private(&path, &sealed)?;

        tracing::info!("[WalletStore] Created wallet {}", public_key);
        Ok(CreateOutcome::Created { public_key, path })
    }

    /// Decrypt the wallet with `password`.
    ///
    /// A wrong password is `Ok(None)`. Errors are reserved for a missing
    /// or unreadable file.
    pub fn unlock(&self, password: &str) -> Result<Option<Credentials>, WalletError> {
        let path = self
            .find_wallet_file()
            .ok_or_else(|| WalletError::NotFound(self.dir.clone()))?;
        let sealed = fs::read(&path)?;
        let plaintext = crypto::decrypt(&sealed, password)?;

        let Ok(payload) = serde_json::from_slice::<WalletPayload>(&plaintext) else {
            tracing::debug!("[WalletStore] Decryption produced invalid JSON");
            return Ok(None);
        };
        if payload.password != password {
            return Ok(None);
        }

        let Some(signing_key) = decode_keypair(&payload.private_key) else {
            tracing::warn!("[WalletStore] Stored keypair is malformed");
            return Ok(None);
        };

        let credentials = Credentials::new(signing_key, password);
        if credentials.public_key() != payload.public_key {
            tracing::warn!("[WalletStore] Stored address does not match keypair");
            return Ok(None);
        }

        Ok(Some(credentials))
    }

    pub fn export_public_key(&self, credentials: &Credentials) -> Result<PathBuf, WalletError> {
        let body = serde_json::to_string_pretty(&serde_json::json!({
            "public_key": credentials.public_key(),
        }))?;

        let path = self.dir.join(PUBLIC_EXPORT_FILE);
        write_private(&path, body.as_bytes())?;
        tracing::info!("[WalletStore] Public key exported to {:?}", path);
        Ok(path)
    }

    /// Export the raw keypair as a one-line byte array. Requires the
    /// password again even though the wallet is unlocked.
    pub fn export_private_key(
        &self,
        credentials: &Credentials,
        password: &str,
    ) -> Result<PathBuf, WalletError> {
        if !credentials.matches_password(password) {
            return Err(WalletError::Locked);
        }

        let keypair = credentials.keypair_bytes();
        let bytes = keypair
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let body = zeroize::Zeroizing::new(format!(
            "{{\n  \"private_key\": [{}],\n  \"public_key\": {}\n}}\n",
            bytes,
            serde_json::to_string(credentials.public_key())?
        ));

        let path = self.dir.join(PRIVATE_EXPORT_FILE);
        write_private(&path, body.as_bytes())?;
        tracing::info!("[WalletStore] Private key exported to {:?}", path);
        Ok(path)
    }
}

fn decode_keypair(encoded: &str) -> Option<SigningKey> {
    let bytes = zeroize::Zeroizing::new(BASE64.decode(encoded).ok()?);
    let keypair: &[u8; KEYPAIR_LENGTH] = bytes.as_slice().try_into().ok()?;
    SigningKey::from_keypair_bytes(keypair).ok()
}

/// Write a file readable only by the owner
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_then_unlock_recovers_address() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallet"));

        let outcome = store.create("correct horse", "correct horse").unwrap();
        let CreateOutcome::Created { public_key, path } = outcome else {
            panic!("expected a new wallet");
        };
        assert!(path.ends_with(format!("{}.solXENwallet", &public_key[..8])));

        let creds = store.unlock("correct horse").unwrap().expect("unlocks");
        assert_eq!(creds.public_key(), public_key);
    }

    #[test]
    fn test_wrong_password_is_none_not_error() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        store.create("correct horse", "correct horse").unwrap();

        assert!(store.unlock("battery staple").unwrap().is_none());
    }

    #[test]
    fn test_password_rules() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());

        assert!(matches!(
            store.create("short", "short"),
            Err(WalletError::PasswordTooShort { min: 8 })
        ));
        assert!(matches!(
            store.create("longenough", "longenougH"),
            Err(WalletError::PasswordMismatch)
        ));
        assert!(store.find_wallet_file().is_none());
    }

    #[test]
    fn test_existing_wallet_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        let CreateOutcome::Created { public_key, .. } =
            store.create("password1", "password1").unwrap()
        else {
            panic!("expected a new wallet");
        };

        let second = store.create("password2", "password2").unwrap();
        assert!(matches!(second, CreateOutcome::Existing { ref prefix, .. } if *prefix == public_key[..8]));
        assert!(store.unlock("password1").unwrap().is_some());
    }

    #[test]
    fn test_unlock_without_wallet_is_not_found() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        assert!(matches!(store.unlock("whatever1"), Err(WalletError::NotFound(_))));
    }

    #[test]
    fn test_exports() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        store.create("password1", "password1").unwrap();
        let creds = store.unlock("password1").unwrap().unwrap();

        let public = store.export_public_key(&creds).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(public).unwrap()).unwrap();
        assert_eq!(value["public_key"], creds.public_key());

        assert!(matches!(
            store.export_private_key(&creds, "password2"),
            Err(WalletError::Locked)
        ));
        let private = store.export_private_key(&creds, "password1").unwrap();
        let raw = fs::read_to_string(private).unwrap();
        assert_eq!(raw.lines().count(), 4);

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let bytes: Vec<u8> = value["private_key"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap() as u8)
            .collect();
        assert_eq!(bytes.as_slice(), creds.keypair_bytes().as_slice());
    }

    #[cfg(unix)]
    #[test]
    fn test_wallet_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        store.create("password1", "password1").unwrap();

        let mode = fs::metadata(store.find_wallet_file().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
