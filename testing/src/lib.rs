//! Helpers for testing simulations with predictable durations.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use std::cell::Cell;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaChaRng;

/// Seeded random number generator of the same kind the simulations use.
#[must_use]
pub fn rng(seed: u64) -> ChaChaRng {
    ChaChaRng::seed_from_u64(seed)
}

/// A sampler that ignores the job and the random number generator, and always returns `value`.
pub fn constant<J: ?Sized>(value: f64) -> impl Fn(&J, &mut dyn RngCore) -> f64 {
    move |_: &J, _: &mut dyn RngCore| value
}

/// A sampler that returns `values` in order, starting over once all of them have been used.
///
/// This is meant for testing, e.g., to give each consecutive job a known, different duration.
///
/// # Panics
///
/// Panics if `values` is empty.
pub fn cycle<J: ?Sized>(values: Vec<f64>) -> impl Fn(&J, &mut dyn RngCore) -> f64 {
    assert!(!values.is_empty(), "cannot cycle over no values");
    let next = Cell::new(0);
    move |_: &J, _: &mut dyn RngCore| {
        let idx = next.get();
        next.set((idx + 1) % values.len());
        values[idx]
    }
}

/// A sampler that draws `next_u32() % modulo` from the random number generator.
///
/// Together with a seeded generator, it produces varied but reproducible integer durations.
pub fn wrapping_echo<J: ?Sized>(modulo: u32) -> impl Fn(&J, &mut dyn RngCore) -> f64 {
    move |_: &J, rng: &mut dyn RngCore| f64::from(rng.next_u32() % modulo)
}
