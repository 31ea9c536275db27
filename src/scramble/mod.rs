//! Random-move scramble generation.
//!
//! The statistics never look inside a scramble; it is stored next to the attempt
//! as an opaque string. [`ScrambleSource`] is the seam for other generators.

mod cube;
mod megaminx;
mod square1;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::PuzzleType;

pub trait ScrambleSource: Send {
    fn scramble(&mut self, puzzle: PuzzleType) -> String;
}

/// WCA-notation random-move scrambles.
pub struct RandomMoveScrambler<R = StdRng> {
    rng: R,
}

impl RandomMoveScrambler<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomMoveScrambler<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomMoveScrambler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> ScrambleSource for RandomMoveScrambler<R> {
    fn scramble(&mut self, puzzle: PuzzleType) -> String {
        let rng = &mut self.rng;
        match puzzle {
            PuzzleType::Cube2x2 => cube::nxn(rng, 2, 11),
            PuzzleType::Cube3x3 => cube::nxn(rng, 3, 20),
            PuzzleType::Cube4x4 => cube::nxn(rng, 4, 40),
            PuzzleType::Cube5x5 => cube::nxn(rng, 5, 60),
            PuzzleType::Cube6x6 => cube::nxn(rng, 6, 80),
            PuzzleType::Cube7x7 => cube::nxn(rng, 7, 100),
            PuzzleType::Pyraminx => cube::pyraminx(rng),
            PuzzleType::Skewb => cube::skewb(rng),
            PuzzleType::Megaminx => megaminx::scramble(rng),
            PuzzleType::Square1 => square1::scramble(rng),
        }
    }
}
