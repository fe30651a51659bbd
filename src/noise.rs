//! Laplace noise for frame size and interval perturbation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of zero-mean perturbations
pub trait Noise: Send {
    /// Draw one sample
    fn sample(&mut self) -> f64;
}

/// Zero-mean Laplace (double exponential) noise with a fixed scale.
///
/// Each instance owns its random source, so the size and duration generators
/// never share state. A sample is the difference of two exponential variates
/// `-s·ln(U1) + s·ln(U2)` with `U1, U2` uniform in `(0, 1]`.
#[derive(Debug, Clone)]
pub struct LaplaceNoise<R = ChaCha8Rng> {
    rng: R,
    scale: f64,
}

impl LaplaceNoise<ChaCha8Rng> {
    /// Create a generator with a deterministic seed.
    pub fn seeded(scale: f64, seed: u64) -> Self {
        Self::new(scale, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create a generator seeded from the thread-local entropy source.
    pub fn from_entropy(scale: f64) -> Self {
        Self::new(scale, ChaCha8Rng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> LaplaceNoise<R> {
    pub fn new(scale: f64, rng: R) -> Self {
        Self { rng, scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Uniform variate in (0, 1] so the logarithm stays finite
    fn uniform(&mut self) -> f64 {
        1.0 - self.rng.random::<f64>()
    }
}

impl<R: Rng + Send> Noise for LaplaceNoise<R> {
    fn sample(&mut self) -> f64 {
        // Degenerate scale collapses to a point mass at zero
        if self.scale <= 0.0 {
            return 0.0;
        }
        let e1 = -self.scale * self.uniform().ln();
        let e2 = -self.scale * self.uniform().ln();
        e1 - e2
    }
}

/// Noise source that always returns the same value
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ConstantNoise(pub f64);

#[cfg(test)]
impl Noise for ConstantNoise {
    fn sample(&mut self) -> f64 {
        self.0
    }
}
