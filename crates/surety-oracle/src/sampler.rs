//! Pseudo-random index sampling
//!
//! Indexes are read from a blake3 XOF seeded with the caller identity, a
//! monotonic nonce and recent ledger state. The nonce advances on every draw,
//! so the same caller never sees the same seed twice, and the ledger chain
//! head keeps the outcome unknown until the preceding call has committed.

use serde::{Deserialize, Serialize};
use surety_common::AccountId;

/// Deterministic index source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSampler {
    nonce: u64,
    space: u8,
}

impl IndexSampler {
    /// Sampler over `0..space`
    pub fn new(space: u8) -> Self {
        Self { nonce: 0, space }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn space(&self) -> u8 {
        self.space
    }

    fn stream(&mut self, caller: &AccountId, context: &[&[u8]]) -> blake3::OutputReader {
        let mut hasher = blake3::Hasher::new();
        hasher.update(caller.as_bytes());
        hasher.update(&self.nonce.to_le_bytes());
        for part in context {
            hasher.update(part);
        }
        self.nonce += 1;
        hasher.finalize_xof()
    }

    /// Next byte mapped uniformly into `0..space` (rejection sampling)
    fn next_index(&self, reader: &mut blake3::OutputReader) -> u8 {
        let space = u16::from(self.space);
        let limit = (256 / space) * space;
        let mut byte = [0u8; 1];
        loop {
            reader.fill(&mut byte);
            let value = u16::from(byte[0]);
            if value < limit {
                return (value % space) as u8;
            }
        }
    }

    /// Draw a single index
    pub fn draw_index(&mut self, caller: &AccountId, context: &[&[u8]]) -> u8 {
        let mut reader = self.stream(caller, context);
        self.next_index(&mut reader)
    }

    /// Draw `count` distinct indexes in draw order
    ///
    /// `count` must not exceed the sampler space.
    pub fn draw_indexes(&mut self, caller: &AccountId, context: &[&[u8]], count: usize) -> Vec<u8> {
        let count = count.min(usize::from(self.space));
        let mut reader = self.stream(caller, context);
        let mut indexes = Vec::with_capacity(count);
        while indexes.len() < count {
            let index = self.next_index(&mut reader);
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }
        indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexes_distinct_and_in_range() {
        let mut sampler = IndexSampler::new(10);
        for n in 0..50 {
            let caller = AccountId::from_label(&format!("oracle-{}", n));
            let indexes = sampler.draw_indexes(&caller, &[b"head"], 3);
            assert_eq!(indexes.len(), 3);
            assert!(indexes.iter().all(|&i| i < 10));
            assert_ne!(indexes[0], indexes[1]);
            assert_ne!(indexes[1], indexes[2]);
            assert_ne!(indexes[0], indexes[2]);
        }
        assert_eq!(sampler.nonce(), 50);
    }

    #[test]
    fn test_full_space_is_a_permutation() {
        let mut sampler = IndexSampler::new(10);
        let mut indexes = sampler.draw_indexes(&AccountId::from_label("o"), &[], 10);
        indexes.sort_unstable();
        assert_eq!(indexes, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_nonce_changes_outcome_stream() {
        let caller = AccountId::from_label("oracle");
        let mut a = IndexSampler::new(255);
        let mut b = IndexSampler::new(255);

        let first = a.draw_indexes(&caller, &[b"head"], 8);
        assert_eq!(first, b.draw_indexes(&caller, &[b"head"], 8));

        // Same inputs at a later nonce diverge
        let second = a.draw_indexes(&caller, &[b"head"], 8);
        assert_ne!(first, second);
    }

    #[test]
    fn test_context_changes_outcome() {
        let caller = AccountId::from_label("oracle");
        let mut a = IndexSampler::new(255);
        let mut b = IndexSampler::new(255);
        assert_ne!(
            a.draw_indexes(&caller, &[b"head-1"], 8),
            b.draw_indexes(&caller, &[b"head-2"], 8)
        );
    }
}
