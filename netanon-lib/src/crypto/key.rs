use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AnonError;

/// A 32-byte secret split into a 16-byte AES-128 key `K` and a 16-byte pad `P`.
#[derive(Clone)]
pub struct AddressKey {
    pub(crate) k: [u8; 16],
    pub(crate) p: [u8; 16],
}

impl AddressKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AnonError> {
        if bytes.len() != 32 {
            return Err(AnonError::BadKey);
        }
        let mut k = [0u8; 16];
        let mut p = [0u8; 16];
        k.copy_from_slice(&bytes[..16]);
        p.copy_from_slice(&bytes[16..]);
        Ok(AddressKey { k, p })
    }

    /// Draws a fresh 32-byte key from the OS's cryptographic RNG.
    pub fn create_random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        AddressKey::from_bytes(&bytes).expect("32-byte buffer always satisfies from_bytes")
    }
}
