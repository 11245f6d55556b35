//! Reproducible number streams for art generation.
//!
//! `SeededStream` is the stream every generation draw comes from. It is not a
//! good random source: it only has to be reproducible and look locally
//! uniform. `XorShift64` is the integer generator used where a table of
//! values has to be derived from a seed (noise permutations, synthetic pools).

/// Hash strings that are empty or blank are replaced by this before seeding.
pub const FALLBACK_HASH: &str =
    "defaultdefaultdefaultdefaultdefaultdefaultdefaultdefaultdefaultdefault";

/// Returns the hash that actually seeds generation for `hash`.
pub fn effective_hash(hash: &str) -> &str {
    if hash.trim().is_empty() {
        FALLBACK_HASH
    } else {
        hash
    }
}

/// Sum of the UTF-16 code units of `hash` (after fallback substitution).
pub fn seed_from_hash(hash: &str) -> u64 {
    effective_hash(hash)
        .encode_utf16()
        .map(u64::from)
        .sum()
}

/// Sine-scrambled counter stream.
#[derive(Debug, Clone)]
pub struct SeededStream {
    counter: f64,
}

impl SeededStream {
    pub fn new(seed: u64) -> Self {
        Self {
            counter: seed as f64,
        }
    }

    pub fn from_hash(hash: &str) -> Self {
        Self::new(seed_from_hash(hash))
    }

    /// Resets the stream to `seed`.
    pub fn seed(&mut self, seed: u64) {
        self.counter = seed as f64;
    }

    /// Next value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        let x = self.counter.sin() * 10_000.0;
        self.counter += 1.0;
        let fract = x - x.floor();
        // Rounding can land exactly on 1.0 for tiny negative x.
        if fract >= 1.0 {
            0.0
        } else {
            fract
        }
    }

    /// Next value in `[0, max)`.
    pub fn below(&mut self, max: f64) -> f64 {
        self.next() * max
    }

    /// Next value in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        self.next() * (max - min) + min
    }

    /// `items[floor(next * len)]`. Always consumes one step, even for an
    /// empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let roll = self.next();
        if items.is_empty() {
            return None;
        }
        let index = ((roll * items.len() as f64).floor() as usize).min(items.len() - 1);
        items.get(index)
    }

    /// Like `pick`, for non-empty fixed-size tables.
    pub fn pick_array<T: Copy, const N: usize>(&mut self, items: &[T; N]) -> T {
        let roll = self.next();
        let index = ((roll * N as f64).floor() as usize).min(N.saturating_sub(1));
        items[index]
    }
}

/// Tiny deterministic PRNG (xorshift64*).
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// `seed = 0` is remapped to a non-zero internal state so the generator
    /// cannot lock into an all-zero sequence.
    pub const fn from_seed(seed: u64) -> Self {
        let mixed = seed ^ 0x9E37_79B9_7F4A_7C15;
        let state = if mixed == 0 {
            0xA076_1D64_78BD_642F
        } else {
            mixed
        };
        Self { state }
    }

    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform `f64` in `[0, 1)` from the top 53 bits.
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }
}
