use cfg_if::cfg_if;

/// Multiplier used by [`Tiered`] to derive a per-hash step from the hash bits.
const TIER_MULTIPLIER: u64 = 0xc6a4_a793_5bd1_e995;

/// Maximum fraction of buckets that may be occupied or hold a tombstone before
/// the table grows.
///
/// Stored as an integer ratio so thresholds can be computed without floating
/// point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadFactor {
    numerator: usize,
    denominator: usize,
}

impl LoadFactor {
    /// Load factor of linear probing, 1/2.
    pub const HALF: LoadFactor = LoadFactor::new(1, 2);

    /// Load factor of tiered probing, 4/5.
    pub const FOUR_FIFTHS: LoadFactor = LoadFactor::new(4, 5);

    /// Creates the load factor `numerator / denominator`.
    ///
    /// # Panics
    ///
    /// Panics unless `0 < numerator <= denominator`.
    pub const fn new(numerator: usize, denominator: usize) -> Self {
        assert!(numerator > 0 && numerator <= denominator);
        Self {
            numerator,
            denominator,
        }
    }

    /// Number of used buckets at which a table of `buckets` buckets must grow,
    /// `floor(buckets * factor + 0.5)`.
    ///
    /// Never exceeds `buckets`.
    ///
    /// ```rust
    /// use packed_hash::probe::LoadFactor;
    ///
    /// assert_eq!(LoadFactor::HALF.threshold(2), 1);
    /// assert_eq!(LoadFactor::FOUR_FIFTHS.threshold(16), 13);
    /// ```
    #[inline]
    pub fn threshold(self, buckets: usize) -> usize {
        let num = self.numerator as u128;
        let den = self.denominator as u128;
        ((buckets as u128 * num * 2 + den) / (den * 2)) as usize
    }

    /// The ratio as a float, for reporting.
    pub fn as_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// A probing strategy: how far to jump between buckets for a given hash, and
/// how full a table using it may become.
///
/// The strategy is fixed for the lifetime of a table. Steps are forced odd by
/// [`ProbeSeq`], so any implementation visits every bucket of a power-of-two
/// table exactly once per cycle.
pub trait Probe {
    /// Distance between consecutive buckets probed for `hash`.
    fn step(&self, hash: u64) -> usize;

    /// Load factor tables using this strategy are held to.
    fn load_factor(&self) -> LoadFactor;

    /// The probe sequence for `hash` in a table of `buckets` buckets.
    ///
    /// Resizing rebuilds this sequence from [`step`](Self::step) alone, so an
    /// override must yield the same buckets.
    #[inline]
    fn sequence(&self, hash: u64, buckets: usize) -> ProbeSeq {
        ProbeSeq::new(hash, self.step(hash), buckets)
    }
}

/// Linear probing: step one bucket at a time, load factor 1/2.
///
/// Favors cache locality and short lookups under moderate load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Linear;

impl Probe for Linear {
    #[inline(always)]
    fn step(&self, _hash: u64) -> usize {
        1
    }

    #[inline(always)]
    fn load_factor(&self) -> LoadFactor {
        LoadFactor::HALF
    }
}

/// Tiered probing: an odd step derived from the high bits of the hash, load
/// factor 4/5.
///
/// Keys sharing a home bucket usually take different paths, which keeps probe
/// lengths bounded when the key distribution collides heavily. Preferable when
/// memory matters more than locality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tiered;

impl Probe for Tiered {
    #[inline(always)]
    fn step(&self, hash: u64) -> usize {
        ((hash.wrapping_mul(TIER_MULTIPLIER) >> 47) | 1) as usize
    }

    #[inline(always)]
    fn load_factor(&self) -> LoadFactor {
        LoadFactor::FOUR_FIFTHS
    }
}

/// A probing strategy chosen at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeKind {
    /// See [`Linear`].
    #[default]
    Linear,
    /// See [`Tiered`].
    Tiered,
}

impl Probe for ProbeKind {
    #[inline(always)]
    fn step(&self, hash: u64) -> usize {
        match self {
            ProbeKind::Linear => Linear.step(hash),
            ProbeKind::Tiered => Tiered.step(hash),
        }
    }

    #[inline(always)]
    fn load_factor(&self) -> LoadFactor {
        match self {
            ProbeKind::Linear => Linear.load_factor(),
            ProbeKind::Tiered => Tiered.load_factor(),
        }
    }
}

cfg_if! {
    if #[cfg(feature = "tier-probing")] {
        /// Probing strategy used when none is named. [`Tiered`] because the
        /// `tier-probing` feature is enabled.
        pub type DefaultProbe = Tiered;
    } else {
        /// Probing strategy used when none is named. [`Linear`] unless the
        /// `tier-probing` feature is enabled.
        pub type DefaultProbe = Linear;
    }
}

/// The buckets visited for one hash, starting at its home bucket.
///
/// Yields each bucket of the table exactly once and then stops, so a loop over
/// it terminates even when no bucket is empty.
///
/// ```rust
/// use packed_hash::probe::Probe;
/// use packed_hash::probe::Linear;
///
/// let visited: Vec<usize> = Linear.sequence(6, 8).collect();
/// assert_eq!(visited, [6, 7, 0, 1, 2, 3, 4, 5]);
/// ```
#[derive(Clone, Debug)]
pub struct ProbeSeq {
    pos: usize,
    start: usize,
    step: usize,
    mask: usize,
    done: bool,
}

impl ProbeSeq {
    /// `buckets` must be zero or a power of two. A zero-bucket sequence is
    /// empty.
    #[inline]
    pub fn new(hash: u64, step: usize, buckets: usize) -> Self {
        debug_assert!(buckets == 0 || buckets.is_power_of_two());
        let mask = buckets.wrapping_sub(1);
        let start = hash as usize & mask;
        Self {
            pos: start,
            start,
            step: step | 1,
            mask,
            done: buckets == 0,
        }
    }

    /// The home bucket of the hash.
    pub fn start(&self) -> usize {
        self.start
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }

        let current = self.pos;
        self.pos = self.pos.wrapping_add(self.step) & self.mask;
        if self.pos == self.start {
            self.done = true;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn assert_full_cycle(seq: ProbeSeq, buckets: usize) {
        let mut seen = vec![false; buckets];
        let mut steps = 0;
        for index in seq {
            assert!(index < buckets);
            assert!(!seen[index], "bucket {index} visited twice");
            seen[index] = true;
            steps += 1;
        }
        assert_eq!(steps, buckets);
    }

    #[test]
    fn linear_walks_forward_and_wraps() {
        let visited: Vec<usize> = Linear.sequence(13, 4).collect();
        assert_eq!(visited, [1, 2, 3, 0]);
    }

    #[test]
    fn tiered_steps_are_odd() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(Tiered.step(rng.random()) % 2, 1);
        }
        assert_eq!(Tiered.step(0), 1);
    }

    #[test]
    fn every_strategy_covers_every_bucket() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        for shift in 0..12 {
            let buckets = 1usize << shift;
            for _ in 0..32 {
                let hash: u64 = rng.random();
                assert_full_cycle(Linear.sequence(hash, buckets), buckets);
                assert_full_cycle(Tiered.sequence(hash, buckets), buckets);
            }
        }
    }

    #[test]
    fn even_steps_are_forced_odd() {
        assert_full_cycle(ProbeSeq::new(3, 4, 16), 16);
        assert_full_cycle(ProbeSeq::new(3, 0, 16), 16);
    }

    #[test]
    fn zero_buckets_is_empty() {
        assert_eq!(Linear.sequence(42, 0).count(), 0);
        assert_eq!(Tiered.sequence(42, 0).count(), 0);
    }

    #[test]
    fn sequence_starts_at_home_bucket() {
        let seq = Tiered.sequence(0x1234_5678, 256);
        assert_eq!(seq.start(), 0x78);
        assert_eq!(seq.clone().next(), Some(0x78));
    }

    #[test]
    fn thresholds_round_half_up() {
        assert_eq!(LoadFactor::HALF.threshold(0), 0);
        assert_eq!(LoadFactor::HALF.threshold(2), 1);
        assert_eq!(LoadFactor::HALF.threshold(4), 2);
        assert_eq!(LoadFactor::HALF.threshold(1024), 512);

        assert_eq!(LoadFactor::FOUR_FIFTHS.threshold(2), 2);
        assert_eq!(LoadFactor::FOUR_FIFTHS.threshold(4), 3);
        assert_eq!(LoadFactor::FOUR_FIFTHS.threshold(8), 6);
        assert_eq!(LoadFactor::FOUR_FIFTHS.threshold(16), 13);
    }

    #[test]
    fn threshold_never_exceeds_buckets() {
        let full = LoadFactor::new(1, 1);
        for shift in 0..20 {
            let buckets = 1usize << shift;
            assert_eq!(full.threshold(buckets), buckets);
            assert!(LoadFactor::FOUR_FIFTHS.threshold(buckets) <= buckets);
        }
    }

    #[test]
    fn kind_matches_static_strategies() {
        for hash in [0u64, 1, 0xdead_beef, u64::MAX] {
            assert_eq!(ProbeKind::Linear.step(hash), Linear.step(hash));
            assert_eq!(ProbeKind::Tiered.step(hash), Tiered.step(hash));
        }
        assert_eq!(ProbeKind::Tiered.load_factor(), LoadFactor::FOUR_FIFTHS);
        assert_eq!(ProbeKind::default(), ProbeKind::Linear);
    }
}
