//! Seedable random number source for the simulation core.
//!
//! Uniform draws come from a [`rand::rngs::StdRng`]; Gaussian draws use
//! the Box-Muller transform and cache the spare value so consecutive
//! calls consume uniforms in pairs. Each instance is owned by exactly
//! one component (the channel injects one through its constructor), so
//! replaying the same call sequence with the same seed reproduces the
//! same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub struct SimRng {
    rng: StdRng,
    seed: u64,
    spare: Option<f64>,
}

impl SimRng {
    /// Creates a new generator. A seed of 0 derives the seed from
    /// entropy; any other value is deterministic.
    pub fn new(seed: u64) -> Self {
        let (rng, seed) = if seed == 0 {
            let mut entropy = StdRng::from_entropy();
            let derived = entropy.gen::<u64>() | 1;
            (StdRng::seed_from_u64(derived), derived)
        } else {
            (StdRng::seed_from_u64(seed), seed)
        };
        SimRng {
            rng,
            seed,
            spare: None,
        }
    }

    /// Reseeds the generator and discards any cached Gaussian spare.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
        self.spare = None;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw in [min, max).
    pub fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.uniform()
    }

    /// Gaussian draw from N(mean, stddev^2) via Box-Muller. One of the
    /// two generated values is cached for the next call.
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return mean + stddev * z;
        }

        let mut u1 = self.uniform();
        while u1 == 0.0 {
            u1 = self.uniform();
        }
        let u2 = self.uniform();

        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.spare = Some(r * theta.sin());
        mean + stddev * r * theta.cos()
    }

    /// Standard normal draw, N(0, 1).
    pub fn normal(&mut self) -> f64 {
        self.gaussian(0.0, 1.0)
    }

    /// Uniform integer draw in [min, max], inclusive on both ends.
    pub fn uniform_int(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }
}
