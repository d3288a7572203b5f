// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// Every simulation owns exactly one of these; all random decisions draw from it in order,
// so a seed fully determines a run.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from the wall clock; used when the caller did not pin a seed.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ 0xD1B54A32D192ED03)
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::new(s),
            None => Self::from_entropy(),
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform in [0,1) with 53 bits of precision.
    #[inline]
    pub fn next_f64_01(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    #[inline]
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64_01()
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        low + (self.next_u64() % span) as usize
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Returns `None` for an empty slice or when every weight is zero.
    pub fn choose_weighted(&mut self, weights: &[u64]) -> Option<usize> {
        let total: u64 = weights.iter().fold(0u64, |acc, w| acc.saturating_add(*w));
        if total == 0 {
            return None;
        }
        let mut target = self.next_u64() % total;
        for (i, &w) in weights.iter().enumerate() {
            if target < w {
                return Some(i);
            }
            target -= w;
        }
        None
    }

    /// `k` distinct indices from `0..n` in draw order (partial Fisher-Yates).
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = self.gen_range_usize(i, n);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Prng::new(42);
        let mut b = Prng::new(42);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn unit_interval_stays_in_range() {
        let mut rng = Prng::new(7);
        for _ in 0..10_000 {
            let x = rng.next_f64_01();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn weighted_choice_skips_zero_weights() {
        let mut rng = Prng::new(3);
        for _ in 0..500 {
            let i = rng.choose_weighted(&[0, 5, 0, 2]).unwrap();
            assert!(i == 1 || i == 3);
        }
        assert_eq!(rng.choose_weighted(&[0, 0]), None);
        assert_eq!(rng.choose_weighted(&[]), None);
    }

    #[test]
    fn sample_indices_are_distinct() {
        let mut rng = Prng::new(11);
        let mut picked = rng.sample_indices(20, 8);
        assert_eq!(picked.len(), 8);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 8);
        assert!(picked.iter().all(|&i| i < 20));

        assert_eq!(rng.sample_indices(3, 10).len(), 3);
    }
}
