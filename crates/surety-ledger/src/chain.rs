//! Ledger chain head
//!
//! Every committed mutating call advances the height and folds the call's
//! notifications into a blake3 hash chain. Oracle index sampling seeds from
//! the head, so indexes depend on recent ledger history.

use serde::{Deserialize, Serialize};

/// Height and hash of the last committed call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    height: u64,
    hash: [u8; 32],
}

impl ChainHead {
    pub fn genesis() -> Self {
        Self::default()
    }

    #[inline]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[inline]
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    /// Fold `payload` into the chain and bump the height
    pub fn advance(&mut self, payload: &[u8]) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.hash);
        hasher.update(&self.height.to_le_bytes());
        hasher.update(payload);
        self.hash = *hasher.finalize().as_bytes();
        self.height += 1;
        self.height
    }
}
