use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::{
    aead::{generic_array::GenericArray, Aead, AeadCore, OsRng},
    PublicKey, SalsaBox, SecretKey,
};

use crate::errors::WalletError;

const NONCE_LEN: usize = 24;

/// X25519 keypair identifying this side of a bridge session
pub struct SessionCrypto {
    secret: SecretKey,
}

impl SessionCrypto {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_hex(secret: &str) -> Result<Self, WalletError> {
        let bytes = decode_key(secret)?;
        Ok(Self {
            secret: SecretKey::from(bytes),
        })
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    /// Client id on the bridge: hex of our public key
    pub fn client_id(&self) -> String {
        hex::encode(self.secret.public_key().as_bytes())
    }

    /// Encrypt for `receiver` (hex public key); output is base64 of `nonce || ciphertext`
    pub fn encrypt(&self, message: &[u8], receiver: &str) -> Result<String, WalletError> {
        let salsa_box = SalsaBox::new(&public_key(receiver)?, &self.secret);
        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let ciphertext = salsa_box
            .encrypt(&nonce, message)
            .map_err(|_| WalletError::Protocol("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a base64 `nonce || ciphertext` message from `sender` (hex public key)
    pub fn decrypt(&self, message: &str, sender: &str) -> Result<Vec<u8>, WalletError> {
        let raw = STANDARD
            .decode(message.trim())
            .map_err(|e| WalletError::Protocol(format!("bad message encoding: {}", e)))?;
        if raw.len() <= NONCE_LEN {
            return Err(WalletError::Protocol("message too short".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let salsa_box = SalsaBox::new(&public_key(sender)?, &self.secret);
        salsa_box
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| WalletError::Protocol("cannot decrypt bridge message".to_string()))
    }
}

fn decode_key(key: &str) -> Result<[u8; 32], WalletError> {
    let bytes = hex::decode(key).map_err(|e| WalletError::Protocol(format!("bad key hex: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::Protocol("key must be 32 bytes".to_string()))
}

fn public_key(key: &str) -> Result<PublicKey, WalletError> {
    Ok(PublicKey::from(decode_key(key)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_between_peers() {
        let app = SessionCrypto::generate();
        let wallet = SessionCrypto::generate();

        let sealed = app.encrypt(b"{\"method\":\"disconnect\"}", &wallet.client_id()).unwrap();
        let opened = wallet.decrypt(&sealed, &app.client_id()).unwrap();
        assert_eq!(opened, b"{\"method\":\"disconnect\"}");
    }

    #[test]
    fn test_wrong_sender_fails() {
        let app = SessionCrypto::generate();
        let wallet = SessionCrypto::generate();
        let stranger = SessionCrypto::generate();

        let sealed = app.encrypt(b"hi", &wallet.client_id()).unwrap();
        assert!(wallet.decrypt(&sealed, &stranger.client_id()).is_err());
    }

    #[test]
    fn test_secret_restore_keeps_identity() {
        let crypto = SessionCrypto::generate();
        let restored = SessionCrypto::from_secret_hex(&crypto.secret_hex()).unwrap();
        assert_eq!(crypto.client_id(), restored.client_id());
        assert_eq!(crypto.client_id().len(), 64);
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(SessionCrypto::from_secret_hex("abcd").is_err());
        assert!(SessionCrypto::generate().encrypt(b"x", "zz").is_err());
    }
}
