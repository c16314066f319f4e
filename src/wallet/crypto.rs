// Wallet File Cipher
//
// AES-256-CTR keyed by SHA-256(password). A random 16-byte IV is
// prepended to the ciphertext.
//

use crate::error::WalletError;
use aes::Aes256;
use ctr::cipher::generic_array::GenericArray;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

pub const IV_LEN: usize = 16;

fn derive_key(password: &str) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&Sha256::digest(password.as_bytes()));
    key
}

pub fn encrypt(plaintext: &[u8], password: &str) -> Vec<u8> {
    let key = derive_key(password);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut out = Vec::with_capacity(IV_LEN + plaintext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(plaintext);

    let mut cipher = Aes256Ctr::new(
        GenericArray::from_slice(key.as_slice()),
        GenericArray::from_slice(&iv),
    );
    cipher.apply_keystream(&mut out[IV_LEN..]);
    out
}

/// CTR mode has no authentication; a wrong password yields garbage,
/// not an error. Callers validate the plaintext.
pub fn decrypt(data: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    if data.len() < IV_LEN {
        return Err(WalletError::Corrupt(format!(
            "file is {} bytes, shorter than the IV",
            data.len()
        )));
    }

    let key = derive_key(password);
    let (iv, ciphertext) = data.split_at(IV_LEN);

    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    let mut cipher = Aes256Ctr::new(
        GenericArray::from_slice(key.as_slice()),
        GenericArray::from_slice(iv),
    );
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}
