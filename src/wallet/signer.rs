// Unlocked Credentials
//
// The in-memory keypair of an unlocked wallet, and fee-payer signing
// of the versioned transactions returned by the swap builder.
//

use crate::error::WalletError;
use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;
use zeroize::Zeroizing;

/// An unlocked wallet. The signing key zeroizes itself on drop.
pub struct Credentials {
    pubkey: Pubkey,
    public_key: String,
    signing_key: SigningKey,
    password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(signing_key: SigningKey, password: &str) -> Self {
        let pubkey = Pubkey::new_from_array(signing_key.verifying_key().to_bytes());
        Self {
            public_key: pubkey.to_string(),
            pubkey,
            signing_key,
            password: Zeroizing::new(password.to_string()),
        }
    }

    /// Base58 address
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    /// 64-byte secret||public keypair, as stored in the wallet file
    pub fn keypair_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LENGTH]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn matches_password(&self, password: &str) -> bool {
        self.password.as_str() == password
    }

    fn keypair(&self) -> Keypair {
        Keypair::new_from_array(self.signing_key.to_bytes())
    }

    /// Sign a swap transaction as its fee payer. The wallet must be the
    /// first static account key and the only required signer.
    pub fn sign_transaction(&self, tx: VersionedTransaction) -> Result<VersionedTransaction, WalletError> {
        let fee_payer = tx
            .message
            .static_account_keys()
            .first()
            .copied()
            .ok_or_else(|| WalletError::Signing("transaction has no account keys".to_string()))?;
        if fee_payer != self.pubkey {
            return Err(WalletError::Signing(format!("fee payer {} is not this wallet", fee_payer)));
        }

        VersionedTransaction::try_new(tx.message, &[&self.keypair()])
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{v0, Message, VersionedMessage};
    use solana_sdk::signature::Signature;
    use std::str::FromStr;

    fn unsigned(message: VersionedMessage) -> VersionedTransaction {
        VersionedTransaction {
            signatures: vec![Signature::default()],
            message,
        }
    }

    fn legacy(payer: &Pubkey) -> VersionedMessage {
        VersionedMessage::Legacy(Message::new(&[], Some(payer)))
    }

    fn v0(payer: &Pubkey) -> VersionedMessage {
        VersionedMessage::V0(v0::Message::try_compile(payer, &[], &[], Hash::default()).unwrap())
    }

    #[test]
    fn test_sign_fills_fee_payer_slot() {
        let creds = Credentials::new(SigningKey::generate(&mut OsRng), "password1");

        for message in [legacy(&creds.pubkey()), v0(&creds.pubkey())] {
            let signed = creds.sign_transaction(unsigned(message)).unwrap();
            assert_eq!(signed.signatures.len(), 1);
            assert_ne!(signed.signatures[0], Signature::default());
            assert!(signed.verify_with_results().iter().all(|ok| *ok));
        }
    }

    #[test]
    fn test_refuses_foreign_fee_payer() {
        let creds = Credentials::new(SigningKey::generate(&mut OsRng), "password1");
        let other = Pubkey::new_from_array([3u8; 32]);

        assert!(matches!(
            creds.sign_transaction(unsigned(v0(&other))),
            Err(WalletError::Signing(_))
        ));
    }

    #[test]
    fn test_public_key_is_base58_of_verifying_key() {
        let creds = Credentials::new(SigningKey::generate(&mut OsRng), "password1");
        let parsed = Pubkey::from_str(creds.public_key()).unwrap();
        assert_eq!(parsed, creds.pubkey());
        assert_eq!(parsed.to_bytes(), creds.signing_key.verifying_key().to_bytes());
        assert!(creds.matches_password("password1"));
        assert!(!creds.matches_password("password2"));
    }
}
