// Wallet Module - Encrypted single-key wallet
//
// This module handles wallet creation, unlocking, exports and signing

pub mod crypto;
pub mod signer;
pub mod store;

pub use signer::Credentials;
pub use store::{CreateOutcome, WalletStore, MIN_PASSWORD_LEN};
