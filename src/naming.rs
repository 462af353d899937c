//! Random trial-name suffixes
//!
//! Trial names are `<experiment>-<suffix>`. Uniqueness rests on the suffix
//! entropy alone, so the generator is injected: production uses thread-local
//! randomness, tests use a seeded generator and get reproducible names.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lowercase consonants and digits without vowels or look-alikes, so
/// suffixes are DNS-1123 safe and never spell words.
pub const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Source of random name suffixes.
pub trait SuffixSource: Send + Sync {
    /// Produce a suffix of exactly `len` characters.
    fn next_suffix(&self, len: usize) -> String;
}

fn draw<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

/// Suffixes from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self, len: usize) -> String {
        draw(&mut rand::thread_rng(), len)
    }
}

/// Deterministic suffixes from a seeded `StdRng`.
///
/// Two sources built from the same seed yield the same sequence.
#[derive(Debug)]
pub struct SeededSuffix {
    rng: Mutex<StdRng>,
}

impl SeededSuffix {
    /// Create a source from a seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SuffixSource for SeededSuffix {
    fn next_suffix(&self, len: usize) -> String {
        // RNG state survives poisoning.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        draw(&mut *rng, len)
    }
}

/// Join an experiment name and a suffix into a trial name.
#[must_use]
pub fn trial_name(experiment_name: &str, suffix: &str) -> String {
    format!("{experiment_name}-{suffix}")
}
