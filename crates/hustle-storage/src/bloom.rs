//! Bloom filter with double-hashing (spec §4.4), used by FilterJoin (LIP)
//! to short-circuit hash-table probes against dimension tables.

use std::sync::atomic::{AtomicU64, Ordering};

/// A bit-array membership filter sized from an expected cardinality and a
/// target false-positive rate.
pub struct BloomFilter {
    bits: Vec<AtomicU64>,
    num_bits: u64,
    num_hashes: u32,
    /// Heuristic "number of probes needed to reject", used by FilterJoin
    /// to order filters from most- to least-selective (spec §4.4/§4.7).
    /// Relaxed ordering suffices: a monotone counter used only to steer
    /// ordering, never for correctness (spec §5).
    memory_weight: AtomicU64,
}

impl BloomFilter {
    /// `m ≈ -(n·ln p) / (ln 2)²`, `k ≈ (m/n)·ln 2`, `m` rounded up to a
    /// multiple of 64 (the word size).
    pub fn new(expected_count: usize, target_fp_rate: f64) -> Self {
        let n = (expected_count.max(1)) as f64;
        let p = target_fp_rate.clamp(1e-6, 0.5);
        let raw_m = -(n * p.ln()) / (std::f64::consts::LN_2 * std::f64::consts::LN_2);
        let mut num_bits = raw_m.ceil() as u64;
        num_bits = num_bits.max(64);
        let rem = num_bits % 64;
        if rem != 0 {
            num_bits += 64 - rem;
        }
        let num_hashes = (((num_bits as f64 / n) * std::f64::consts::LN_2).round() as u32)
            .clamp(1, 24);

        let words = (num_bits / 64) as usize;
        let mut bits = Vec::with_capacity(words);
        bits.resize_with(words, || AtomicU64::new(0));

        Self {
            bits,
            num_bits,
            num_hashes,
            memory_weight: AtomicU64::new(0),
        }
    }

    /// A stable 64-bit mix (splitmix64), used as the single hash from which
    /// both double-hashing components are derived.
    fn mix(key: i64) -> u64 {
        let mut z = key as u64;
        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn positions(&self, key: i64) -> impl Iterator<Item = u64> + '_ {
        let h = Self::mix(key);
        let low = h & 0xFFFF_FFFF;
        let high = h >> 32;
        (0..self.num_hashes as u64).map(move |i| (low.wrapping_add(i.wrapping_mul(high))) % self.num_bits)
    }

    fn set_bit(&self, pos: u64) {
        let word = (pos / 64) as usize;
        let bit = pos % 64;
        self.bits[word].fetch_or(1 << bit, Ordering::Relaxed);
    }

    fn get_bit(&self, pos: u64) -> bool {
        let word = (pos / 64) as usize;
        let bit = pos % 64;
        self.bits[word].load(Ordering::Relaxed) & (1 << bit) != 0
    }

    pub fn insert(&self, key: i64) {
        for pos in self.positions(key) {
            self.set_bit(pos);
        }
    }

    /// `false` guarantees absence; `true` means possibly present. Also
    /// updates the memory-weight heuristic from the observed reject rate.
    pub fn probe(&self, key: i64) -> bool {
        let mut probes_taken = 0u64;
        let mut present = true;
        for pos in self.positions(key) {
            probes_taken += 1;
            if !self.get_bit(pos) {
                present = false;
                break;
            }
        }
        if !present {
            self.memory_weight.fetch_add(probes_taken, Ordering::Relaxed);
        }
        present
    }

    /// Current memory weight: higher means this filter has historically
    /// rejected rows quickly, so FilterJoin applies it earlier (spec §4.7
    /// step 2/5).
    pub fn memory_weight(&self) -> u64 {
        self.memory_weight.load(Ordering::Relaxed)
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_keys_always_probe_present() {
        let filter = BloomFilter::new(1000, 0.01);
        for k in 0..1000i64 {
            filter.insert(k);
        }
        for k in 0..1000i64 {
            assert!(filter.probe(k), "false negative for key {k}");
        }
    }

    #[test]
    fn false_positive_rate_is_roughly_bounded() {
        let filter = BloomFilter::new(2000, 0.01);
        for k in 0..2000i64 {
            filter.insert(k);
        }
        let mut false_positives = 0;
        let trials = 20_000i64;
        for k in 2_000_000..2_000_000 + trials {
            if filter.probe(k) {
                false_positives += 1;
            }
        }
        let observed_rate = false_positives as f64 / trials as f64;
        assert!(
            observed_rate < 0.05,
            "observed fp rate {observed_rate} far exceeds target"
        );
    }

    #[test]
    fn memory_weight_grows_with_rejections() {
        let filter = BloomFilter::new(100, 0.01);
        filter.insert(1);
        assert_eq!(filter.memory_weight(), 0);
        let _ = filter.probe(999_999);
        assert!(filter.memory_weight() > 0);
    }
}
