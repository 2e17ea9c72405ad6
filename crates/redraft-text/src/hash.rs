//! Hashing primitives
//!
//! Two strengths of hash live here:
//! - [`ContentHash`]: 32-byte Blake3 digest used for cache keys, where a
//!   collision would serve somebody else's analysis.
//! - [`Fingerprint`]: 32-bit rolling hash of normalized paragraph text, used
//!   only as a cheap equality pre-check during change detection.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
///
/// Keys the analysis cache. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new `ContentHash` from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Start a multi-part hash
    #[inline]
    #[must_use]
    pub fn builder() -> ContentHasher {
        ContentHasher::default()
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher for keys built from several parts
///
/// Every part is length-prefixed so `("ab", "c")` and `("a", "bc")` never
/// collide.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    /// Feed a byte part
    #[must_use]
    pub fn part(mut self, data: &[u8]) -> Self {
        self.inner.update(&(data.len() as u64).to_le_bytes());
        self.inner.update(data);
        self
    }

    /// Feed a string part
    #[must_use]
    pub fn text(self, data: &str) -> Self {
        self.part(data.as_bytes())
    }

    /// Feed a serializable value as canonical JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn json<T>(self, value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize,
    {
        let json = serde_json::to_vec(value)?;
        Ok(self.part(&json))
    }

    /// Finish and produce the hash
    #[must_use]
    pub fn finish(self) -> ContentHash {
        ContentHash::new(*self.inner.finalize().as_bytes())
    }
}

/// 32-bit non-cryptographic fingerprint of normalized paragraph text
///
/// Normalization trims surrounding whitespace and lower-cases. Collisions only
/// cause a missed change, which the periodic forced full analysis recovers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Fingerprint(pub u32);

impl Fingerprint {
    /// Fingerprint of the empty paragraph
    pub const EMPTY: Self = Self(0);

    /// Fingerprint text after normalization
    #[must_use]
    pub fn of(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        let hash = normalized.chars().fold(0u32, |h, c| {
            h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as u32)
        });
        Self(hash)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
