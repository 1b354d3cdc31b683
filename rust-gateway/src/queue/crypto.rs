//! Transparent at-rest encryption for message bodies.
//!
//! Bodies are sealed before they reach the store and unsealed on delivery;
//! nothing above the queue sees anything but plaintext. The cipher XORs the
//! plaintext with a keyed keystream, block i = HMAC-SHA256(key, nonce || i),
//! and the sealed layout is `nonce || ciphertext`.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_BYTES: usize = 16;
const BLOCK_BYTES: usize = 32;

/// Keyed cipher applied to every stored message body.
pub struct BodyCipher {
    mac: HmacSha256,
}

impl BodyCipher {
    /// Create a cipher with an explicit key.
    pub fn new(key: &[u8]) -> Self {
        // HMAC-SHA256 accepts keys of any length
        let mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
        Self { mac }
    }

    /// Create a cipher with a random per-process key (managed-key mode).
    pub fn managed() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(&key)
    }

    /// Seal a plaintext body for storage.
    pub fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut sealed = Vec::with_capacity(NONCE_BYTES + plaintext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(plaintext);
        self.apply_keystream(&nonce, &mut sealed[NONCE_BYTES..]);
        sealed
    }

    /// Unseal a stored body. Returns `None` if the input is too short to
    /// carry a nonce.
    pub fn unseal(&self, sealed: &[u8]) -> Option<Vec<u8>> {
        if sealed.len() < NONCE_BYTES {
            return None;
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_BYTES);
        let mut plaintext = ciphertext.to_vec();
        self.apply_keystream(nonce, &mut plaintext);
        Some(plaintext)
    }

    fn apply_keystream(&self, nonce: &[u8], data: &mut [u8]) {
        for (block_index, chunk) in data.chunks_mut(BLOCK_BYTES).enumerate() {
            let mut mac = self.mac.clone();
            mac.update(nonce);
            mac.update(&(block_index as u64).to_be_bytes());
            let block = mac.finalize().into_bytes();

            for (byte, key_byte) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= key_byte;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_round_trip() {
        let cipher = BodyCipher::new(b"test-key");
        let body = b"a&b=c with arbitrary bytes \x00\xff".to_vec();

        let sealed = cipher.seal(&body);
        assert_eq!(cipher.unseal(&sealed), Some(body));
    }

    #[test]
    fn test_seal_round_trip_multi_block() {
        let cipher = BodyCipher::new(b"test-key");
        let body: Vec<u8> = (0..=255).cycle().take(1000).collect();

        let sealed = cipher.seal(&body);
        assert_eq!(cipher.unseal(&sealed), Some(body));
    }

    #[test]
    fn test_sealed_differs_from_plaintext() {
        let cipher = BodyCipher::new(b"test-key");
        let body = b"sensitive payload".to_vec();

        let sealed = cipher.seal(&body);
        assert_ne!(&sealed[NONCE_BYTES..], body.as_slice());
    }

    #[test]
    fn test_distinct_nonces_per_seal() {
        let cipher = BodyCipher::new(b"test-key");
        let body = b"same body".to_vec();

        let first = cipher.seal(&body);
        let second = cipher.seal(&body);
        assert_ne!(first, second);
    }

    #[test]
    fn test_unseal_truncated_input() {
        let cipher = BodyCipher::new(b"test-key");
        assert_eq!(cipher.unseal(&[0u8; 4]), None);
    }

    #[test]
    fn test_managed_keys_are_independent() {
        let body = b"payload".to_vec();
        let sealed = BodyCipher::managed().seal(&body);

        // A different key cannot recover the plaintext
        assert_ne!(BodyCipher::managed().unseal(&sealed), Some(body));
    }

    #[test]
    fn test_seal_empty_body() {
        let cipher = BodyCipher::new(b"test-key");
        let sealed = cipher.seal(b"");
        assert_eq!(sealed.len(), NONCE_BYTES);
        assert_eq!(cipher.unseal(&sealed), Some(Vec::new()));
    }
}
