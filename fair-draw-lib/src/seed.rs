use chrono::Utc;
use cryptoxide::{blake2b::Blake2b, digest::Digest};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type Nonce = u64;

pub const SEED_LENGTH: usize = 16;
const BLAKE2B_256_BYTES: usize = 32;

/// The public inputs of a single draw.
///
/// Publishing the three fields after the draw lets anyone recompute the hash,
/// the winning ticket and therefore the winner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SeedMaterial {
    pub client_seed: String,
    pub server_seed: String,
    pub nonce: Nonce,
}

impl SeedMaterial {
    pub fn new(client_seed: impl Into<String>, server_seed: impl Into<String>, nonce: Nonce) -> Self {
        Self {
            client_seed: client_seed.into(),
            server_seed: server_seed.into(),
            nonce,
        }
    }

    /// Pairs the operator's client seed with a freshly generated server seed.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, client_seed: impl Into<String>, nonce: Nonce) -> Self {
        Self::new(client_seed, generate_server_seed(rng), nonce)
    }

    pub fn hash(&self, algorithm: HashAlgorithm) -> String {
        algorithm.hash(&self.client_seed, &self.server_seed, self.nonce)
    }
}

fn random_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SEED_LENGTH)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

pub fn generate_client_seed<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_token(rng)
}

pub fn generate_server_seed<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_token(rng)
}

/// Published verification method of a draw.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// Hex encoded BLAKE2b-256 of `client:server:nonce`.
    Blake2b256,
    /// 32 bit string hash of `client-server-nonce` (`h = 31 * h + c` over
    /// UTF-16 code units), absolute value, zero padded to 8 hex digits.
    /// Needed to re-verify draws published by the web roulette.
    Legacy,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Blake2b256
    }
}

impl HashAlgorithm {
    pub fn hash(self, client_seed: &str, server_seed: &str, nonce: Nonce) -> String {
        match self {
            HashAlgorithm::Blake2b256 => blake2b_256_hex(client_seed, server_seed, nonce),
            HashAlgorithm::Legacy => legacy_hex(client_seed, server_seed, nonce),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Blake2b256 => write!(f, "blake2b256"),
            HashAlgorithm::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown hash algorithm {0}, expected blake2b256 or legacy")]
pub struct UnknownAlgorithm(String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "blake2b256" => Ok(HashAlgorithm::Blake2b256),
            "legacy" => Ok(HashAlgorithm::Legacy),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash with the default algorithm.
pub fn hash(client_seed: &str, server_seed: &str, nonce: Nonce) -> String {
    HashAlgorithm::default().hash(client_seed, server_seed, nonce)
}

fn blake2b_256_hex(client_seed: &str, server_seed: &str, nonce: Nonce) -> String {
    let mut hasher = Blake2b::new(BLAKE2B_256_BYTES);
    hasher.input(format!("{}:{}:{}", client_seed, server_seed, nonce).as_bytes());
    let mut digest = [0u8; BLAKE2B_256_BYTES];
    hasher.result(&mut digest);
    hex::encode(digest)
}

fn legacy_hex(client_seed: &str, server_seed: &str, nonce: Nonce) -> String {
    let hash = format!("{}-{}-{}", client_seed, server_seed, nonce)
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        });
    format!("{:08x}", hash.unsigned_abs())
}

/// Strictly increasing draw nonces based on the wall clock (unix millis).
///
/// Two draws within the same millisecond still get distinct nonces.
#[derive(Clone, Debug, Default)]
pub struct NonceSequence {
    last: Option<Nonce>,
}

impl NonceSequence {
    pub fn last(&self) -> Option<Nonce> {
        self.last
    }

    /// The nonce the next draw would use, without consuming it.
    pub fn peek(&self) -> Nonce {
        self.after(now_millis())
    }

    pub fn next_nonce(&mut self) -> Nonce {
        let nonce = self.peek();
        self.observe(nonce);
        nonce
    }

    /// Records a nonce used elsewhere (e.g. a replayed draw) so that later
    /// nonces stay above it.
    pub fn observe(&mut self, nonce: Nonce) {
        self.last = Some(self.last.map_or(nonce, |last| last.max(nonce)));
    }

    fn after(&self, now: Nonce) -> Nonce {
        match self.last {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        }
    }
}

fn now_millis() -> Nonce {
    Nonce::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_strategy::proptest;

    #[test]
    fn blake2b_golden_vectors() {
        assert_eq!(
            HashAlgorithm::Blake2b256.hash("client", "server", 1),
            "cfd7c494acd5413aa77b4b50cf3fdd3cb47d4c1c9f8cc6f8d3e1418cb45d1e74"
        );
        assert_eq!(
            HashAlgorithm::Blake2b256.hash("abc", "xyz", 1_700_000_000_000),
            "615c2a9d802f6e5bac494a3fa965ca824b6ce04084f87da13bf631ffbd814d84"
        );
        assert_eq!(
            hash("lucky", "seed", 42),
            "52ffae61507685485d6609da3604b3a23d8392b518add4a40ce1dc25c334832d"
        );
    }

    #[test]
    fn legacy_golden_vectors() {
        assert_eq!(HashAlgorithm::Legacy.hash("client", "server", 1), "0bf9ec17");
        assert_eq!(
            HashAlgorithm::Legacy.hash("abc", "xyz", 1_700_000_000_000),
            "0a520e6b"
        );
        assert_eq!(HashAlgorithm::Legacy.hash("lucky", "seed", 42), "60f46a8b");
    }

    #[test]
    fn legacy_hash_is_always_eight_hex_digits() {
        assert_eq!(HashAlgorithm::Legacy.hash("", "", 0), "0000ae90");
        assert_eq!(HashAlgorithm::Legacy.hash("a", "", 0), "002cc68f");
    }

    #[proptest]
    fn hash_is_deterministic(client_seed: String, server_seed: String, nonce: u64) {
        for algorithm in [HashAlgorithm::Blake2b256, HashAlgorithm::Legacy] {
            let material = SeedMaterial::new(client_seed.clone(), server_seed.clone(), nonce);
            assert_eq!(material.hash(algorithm), material.clone().hash(algorithm));
            assert!(material.hash(algorithm).chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn algorithm_names_match_serde() {
        for algorithm in [HashAlgorithm::Blake2b256, HashAlgorithm::Legacy] {
            let name = algorithm.to_string();
            assert_eq!(name.parse::<HashAlgorithm>().unwrap(), algorithm);
            assert_eq!(serde_json::to_string(&algorithm).unwrap(), format!("\"{}\"", name));
        }
        assert!("sha1".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn seeds_are_alphanumeric_tokens() {
        let mut rng = ChaCha8Rng::from_seed([7; 32]);
        let client = generate_client_seed(&mut rng);
        let server = generate_server_seed(&mut rng);
        assert_eq!(client.len(), SEED_LENGTH);
        assert!(client.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(server.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(client, server);
    }

    #[test]
    fn seed_generation_is_reproducible_with_a_seeded_rng() {
        let a = SeedMaterial::generate(&mut ChaCha8Rng::from_seed([1; 32]), "client", 3);
        let b = SeedMaterial::generate(&mut ChaCha8Rng::from_seed([1; 32]), "client", 3);
        assert_eq!(a, b);
        assert_eq!(a.client_seed, "client");
    }

    #[test]
    fn nonces_strictly_increase() {
        let mut nonces = NonceSequence::default();
        let mut previous = nonces.next_nonce();
        for _ in 0..1000 {
            let next = nonces.next_nonce();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn observed_nonce_from_the_future_is_respected() {
        let mut nonces = NonceSequence::default();
        nonces.observe(u64::MAX - 1);
        assert_eq!(nonces.next_nonce(), u64::MAX);
        assert_eq!(nonces.last(), Some(u64::MAX));
    }
}
