use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::error::{TraceError, TraceResult};
use crate::render::Rasterizer;
use crate::shape::Polygon;
use crate::step::Step;

use super::Engine;

/// batches drawn before a round with no valid candidate is given up
pub const MAX_RESAMPLE_BATCHES: usize = 64;

/// outcome of hill climbing from one seed step
#[derive(Clone, Debug)]
pub struct Refinement {
    pub step: Step,
    pub attempts: usize,
    pub improvements: usize,
}

/// First-improvement hill climbing.
///
/// `propose` gets the current best and returns a scored neighbor, or None when the
/// neighbor was unusable. A strictly lower distance is adopted and resets the failure
/// counter; anything else counts as a failure. Stops after `patience` consecutive failures.
pub fn hill_climb<F>(seed: Step, patience: usize, mut propose: F) -> TraceResult<Refinement>
where
    F: FnMut(&Step) -> TraceResult<Option<Step>>,
{
    profiling::scope!("hill_climb");
    let mut best = seed;
    let mut failures = 0;
    let mut attempts = 0;
    let mut improvements = 0;

    while failures < patience {
        attempts += 1;
        match propose(&best)? {
            Some(candidate) if candidate.distance < best.distance => {
                best = candidate;
                failures = 0;
                improvements += 1;
            }
            _ => failures += 1,
        }
    }

    Ok(Refinement {
        step: best,
        attempts,
        improvements,
    })
}

impl<R: Rasterizer> Engine<R> {
    /// Score `breadth` random candidates in parallel and keep the lowest distance.
    /// Seeds come from the master RNG in order, so the winner doesn't depend on scheduling;
    /// ties go to the earlier candidate. None if every batch came back invalid.
    pub(super) fn find_best_step(&mut self) -> TraceResult<Option<Step>> {
        profiling::scope!("find_best_step");
        let (width, height) = (self.state.width(), self.state.height());

        for batch in 0..MAX_RESAMPLE_BATCHES {
            let seeds: Vec<u64> = (0..self.cfg.breadth).map(|_| self.rng.random::<u64>()).collect();

            let (cfg, state, renderer) = (&self.cfg, &self.state, &self.renderer);
            let scored: Vec<TraceResult<Step>> = seeds
                .par_iter()
                .map(|&seed| {
                    profiling::scope!("score_candidate");
                    let mut rng = Pcg32::seed_from_u64(seed);
                    let shape = Polygon::create(&mut rng, &cfg.shape_kinds, width, height);
                    Step::unscored(shape, cfg.alpha).compute(state, renderer, cfg.strict_consistency)
                })
                .collect();

            let mut best: Option<Step> = None;
            for result in scored {
                match result {
                    Ok(step) => {
                        if best.as_ref().map_or(true, |b| step.distance < b.distance) {
                            best = Some(step);
                        }
                    }
                    Err(TraceError::InvalidShape) => {}
                    Err(err) => return Err(err),
                }
            }

            if best.is_some() {
                if batch > 0 {
                    tracing::debug!(batches = batch + 1, "resampled candidate batch");
                }
                return Ok(best);
            }
        }

        tracing::warn!(
            batches = MAX_RESAMPLE_BATCHES,
            breadth = self.cfg.breadth,
            "no candidate covered the canvas, skipping round"
        );
        Ok(None)
    }

    /// hill-climb from `seed` with the master RNG; invalid neighbors count as failures
    pub(super) fn refine_step(&mut self, seed: Step) -> TraceResult<Refinement> {
        profiling::scope!("refine_step");
        let (rng, cfg, state, renderer) = (&mut self.rng, &self.cfg, &self.state, &self.renderer);
        hill_climb(seed, cfg.patience, |best| {
            match best.mutate(rng, cfg).compute(state, renderer, cfg.strict_consistency) {
                Ok(step) => Ok(Some(step)),
                Err(TraceError::InvalidShape) => Ok(None),
                Err(err) => Err(err),
            }
        })
    }
}
