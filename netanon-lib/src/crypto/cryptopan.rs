use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use tokio::sync::RwLock;

use super::key::AddressKey;

/// One immutable keyed context: an AES-128 schedule over `K` and the 128-bit pad `P`,
/// both top-bit-aligned so the per-bit loop in `anonymize_u128` can merge them with a
/// plain mask.
struct KeyedContext {
    cipher: Aes128,
    pad: u128,
}

impl KeyedContext {
    fn new(key: &AddressKey) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(&key.k));
        let pad = u128::from_be_bytes(key.p);
        KeyedContext { cipher, pad }
    }

    /// Fan et al.'s prefix-preserving bit loop, generalized over `width` (32 for IPv4,
    /// 128 for IPv6). `addr_ext` holds the address top-aligned in a `u128`: for IPv4 the
    /// 32 address bits occupy the top 32 bits and the rest are zero.
    fn anonymize_bits(&self, addr_ext: u128, width: u32) -> u128 {
        let mut result: u128 = 0;
        for i in 0..width {
            let mask = if i == 0 { 0u128 } else { !0u128 << (128 - i) };
            let merged = (addr_ext & mask) | (self.pad & !mask);
            let mut block = GenericArray::clone_from_slice(&merged.to_be_bytes());
            self.cipher.encrypt_block(&mut block);
            let flip = (block[0] & 0x80) != 0;
            let addr_bit = (addr_ext >> (127 - i)) & 1 != 0;
            let out_bit = addr_bit ^ flip;
            if out_bit {
                result |= 1u128 << (width - 1 - i);
            }
        }
        result
    }
}

/// The active Crypto-PAn context, guarded by a reader-preferred lock: many concurrent
/// rewriters read, the rotator rarely writes. The rotator must not hold the write lock
/// across I/O — it only ever swaps an already-constructed `KeyedContext` in.
pub struct CryptoPanEngine {
    inner: RwLock<KeyedContext>,
}

impl CryptoPanEngine {
    pub fn new(key: AddressKey) -> Self {
        CryptoPanEngine {
            inner: RwLock::new(KeyedContext::new(&key)),
        }
    }

    pub async fn anonymize(&self, ip: IpAddr) -> IpAddr {
        let ctx = self.inner.read().await;
        match ip {
            IpAddr::V4(v4) => {
                let addr_ext = (u32::from(v4) as u128) << 96;
                let out = ctx.anonymize_bits(addr_ext, 32) as u32;
                IpAddr::V4(Ipv4Addr::from(out))
            }
            IpAddr::V6(v6) => {
                let addr_ext = u128::from(v6);
                let out = ctx.anonymize_bits(addr_ext, 128);
                IpAddr::V6(Ipv6Addr::from(out))
            }
        }
    }

    pub async fn rotate(&self, key: AddressKey) {
        let mut guard = self.inner.write().await;
        *guard = KeyedContext::new(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn common_prefix_len_v4(a: Ipv4Addr, b: Ipv4Addr) -> u32 {
        (u32::from(a) ^ u32::from(b)).leading_zeros()
    }

    fn common_prefix_len_v6(a: Ipv6Addr, b: Ipv6Addr) -> u32 {
        (u128::from(a) ^ u128::from(b)).leading_zeros()
    }

    #[tokio::test]
    async fn known_reference_vector() {
        // The canonical 32-byte Crypto-PAn sample key, as published with the reference
        // implementation.
        let key_bytes: [u8; 32] = [
            21, 34, 23, 141, 51, 164, 207, 128, 19, 10, 91, 22, 17, 255, 18, 62, 98, 76, 21, 55,
            123, 21, 43, 213, 123, 134, 0, 93, 21, 2, 23, 64,
        ];
        let key = AddressKey::from_bytes(&key_bytes).unwrap();
        let engine = CryptoPanEngine::new(key);
        let out = engine.anonymize("128.11.68.132".parse().unwrap()).await;
        assert_eq!(out, "135.242.180.132".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn prefix_preservation_v4_random_sampling() {
        let engine = CryptoPanEngine::new(AddressKey::create_random());
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let a = Ipv4Addr::from(rng.gen::<u32>());
            let prefix_bits: u32 = rng.gen_range(0..=32);
            let mask: u32 = if prefix_bits == 0 { 0 } else { !0u32 << (32 - prefix_bits) };
            let b = Ipv4Addr::from((u32::from(a) & mask) | (rng.gen::<u32>() & !mask));
            let n = common_prefix_len_v4(a, b);
            let (IpAddr::V4(aa), IpAddr::V4(bb)) = (
                engine.anonymize(IpAddr::V4(a)).await,
                engine.anonymize(IpAddr::V4(b)).await,
            ) else {
                unreachable!()
            };
            assert!(common_prefix_len_v4(aa, bb) >= n, "prefix not preserved for n={n}");
        }
    }

    #[tokio::test]
    async fn prefix_preservation_v6_random_sampling() {
        let engine = CryptoPanEngine::new(AddressKey::create_random());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = Ipv6Addr::from(rng.gen::<u128>());
            let prefix_bits: u32 = rng.gen_range(0..=128);
            let mask: u128 = if prefix_bits == 0 { 0 } else { !0u128 << (128 - prefix_bits) };
            let b = Ipv6Addr::from((u128::from(a) & mask) | (rng.gen::<u128>() & !mask));
            let n = common_prefix_len_v6(a, b);
            let (IpAddr::V6(aa), IpAddr::V6(bb)) = (
                engine.anonymize(IpAddr::V6(a)).await,
                engine.anonymize(IpAddr::V6(b)).await,
            ) else {
                unreachable!()
            };
            assert!(common_prefix_len_v6(aa, bb) >= n, "prefix not preserved for n={n}");
        }
    }

    #[tokio::test]
    async fn deterministic_for_fixed_key() {
        let key = AddressKey::create_random();
        let k = key.k;
        let p = key.p;
        let engine_a = CryptoPanEngine::new(key);
        let engine_b = CryptoPanEngine::new(AddressKey { k, p });
        let addr: IpAddr = "203.0.113.42".parse().unwrap();
        assert_eq!(engine_a.anonymize(addr).await, engine_b.anonymize(addr).await);
    }

    #[tokio::test]
    async fn injective_over_random_sample() {
        let engine = CryptoPanEngine::new(AddressKey::create_random());
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5000 {
            let a = Ipv4Addr::from(rng.gen::<u32>());
            let out = engine.anonymize(IpAddr::V4(a)).await;
            assert!(seen.insert(out), "collision anonymizing {a}");
        }
    }

    #[tokio::test]
    async fn rotate_swaps_output() {
        let engine = CryptoPanEngine::new(AddressKey::create_random());
        let addr: IpAddr = "198.51.100.7".parse().unwrap();
        let before = engine.anonymize(addr).await;
        engine.rotate(AddressKey::create_random()).await;
        let after = engine.anonymize(addr).await;
        assert_ne!(before, after, "new key should (overwhelmingly likely) change output");
    }
}
