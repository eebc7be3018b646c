// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value sources for the update loop.
//!
//! Production runs draw from an entropy-seeded generator; tests inject a
//! seeded generator or a scripted source behind the same [`ValueSource`]
//! interface.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::TagRange;

/// Produces the next value of a tag within its declared range.
pub trait ValueSource: Send {
    /// Draws a value in `[range.min(), range.max())`.
    fn draw(&mut self, range: &TagRange) -> f64;
}

/// Uniform random draws backed by any [`Rng`].
#[derive(Debug, Clone)]
pub struct UniformSource<R = StdRng> {
    rng: R,
}

impl UniformSource<StdRng> {
    /// Creates an unseeded source.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> UniformSource<R> {
    /// Wraps an existing generator.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> ValueSource for UniformSource<R> {
    fn draw(&mut self, range: &TagRange) -> f64 {
        self.rng.gen_range(range.min()..range.max())
    }
}

impl<S: ValueSource + ?Sized> ValueSource for Box<S> {
    fn draw(&mut self, range: &TagRange) -> f64 {
        (**self).draw(range)
    }
}
