#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use derive_parity::test_utils::{FixtureImplementation, FnRoutine};
use derive_parity::{Comparator, Implementation, StaticLoader};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use derive_parity::test_utils::{init_test_logging, init_test_logging_with_level};

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "DERIVE_PARITY_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    std::env::var("CI").ok().map(|_| DEFAULT_PROPTEST_SEED)
}

/// Code of the `index`-th sample position.
#[must_use]
pub fn code(index: usize) -> String {
    format!("P{index:03}")
}

/// Reference of `size` sample positions and a candidate whose `tone` differs at
/// every index in `divergent`.
#[must_use]
pub fn diverging_pair(size: usize, divergent: &[usize]) -> (FixtureImplementation, FixtureImplementation) {
    let candidate = divergent
        .iter()
        .fold(FixtureImplementation::sample("cand", size), |fixture, i| {
            fixture.with_attribute(&code(*i), "tone", "X")
        });
    (FixtureImplementation::sample("ref", size), candidate)
}

/// Loader with schemas reading the sample attributes.
#[must_use]
pub fn attribute_loader() -> StaticLoader {
    StaticLoader::new()
        .with("initials", |_| FnRoutine::attribute("initial"))
        .with("tones", |_| FnRoutine::attribute("tone"))
        .with("indices", |_| FnRoutine::attribute("index"))
}

/// Comparator over `pair` with `loader`.
#[must_use]
pub fn comparator(
    pair: (FixtureImplementation, FixtureImplementation),
    loader: StaticLoader,
) -> Comparator {
    let (reference, candidate) = pair;
    Comparator::new(Arc::new(reference), Arc::new(candidate), Arc::new(loader))
}

/// The demo directory shipped with the crate.
#[must_use]
pub fn demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demo")
}
