// Engine module organization
// optimizer holds the per-round search (candidate batch + hill climbing)

pub mod optimizer;

pub use optimizer::{hill_climb, Refinement, MAX_RESAMPLE_BATCHES};

use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::TraceResult;
use crate::export::Primitive;
use crate::fitness::MetricsSnapshot;
use crate::raster::RasterBuffer;
use crate::render::{CpuRenderer, Rasterizer};
use crate::search_config::SearchConfig;
use crate::state::SearchState;
use crate::step::Step;

/// where the engine is inside the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching(u64),
    Refining(u64),
    Deciding(u64),
    Done,
}

/// result of one round. both variants consume a round from the budget.
#[derive(Clone, Debug, PartialEq)]
pub enum RoundOutcome {
    Accepted(Step),
    Skipped,
}

impl RoundOutcome {
    pub fn step(&self) -> Option<&Step> {
        match self {
            RoundOutcome::Accepted(step) => Some(step),
            RoundOutcome::Skipped => None,
        }
    }
}

pub struct Engine<R: Rasterizer = CpuRenderer> {
    rng: Pcg32, // master RNG: candidate seeds and every refinement mutation
    cfg: SearchConfig,
    renderer: R,
    state: SearchState,
    phase: Phase,
    round: u64,                 // rounds completed so far
    primitives: Vec<Primitive>, // accepted steps, in acceptance order
    baseline_distance: f64,     // distance of the plain fill, for improvement percent
    fill: [u8; 3],
}

impl<R: Rasterizer> Engine<R> {
    /// validates `cfg` and starts from a canvas uniformly painted with `fill`
    pub fn new(target: RasterBuffer, fill: [u8; 3], cfg: SearchConfig, renderer: R) -> TraceResult<Self> {
        profiling::scope!("Engine::new");
        cfg.validate()?;

        let (width, height) = target.dimensions();
        let current = RasterBuffer::filled(width, height, fill);
        let state = SearchState::new(Arc::new(target), current)?;
        let baseline_distance = state.distance();

        info!(
            width,
            height,
            rounds = cfg.rounds,
            breadth = cfg.breadth,
            patience = cfg.patience,
            seed = cfg.seed,
            baseline = baseline_distance,
            "engine ready"
        );

        Ok(Self {
            rng: Pcg32::seed_from_u64(cfg.seed),
            cfg,
            renderer,
            state,
            phase: Phase::Idle,
            round: 0,
            primitives: Vec::new(),
            baseline_distance,
            fill,
        })
    }

    /// run one round: search, refine, decide.
    /// returns None once the round budget is spent.
    #[tracing::instrument(level = "debug", skip_all, fields(round = self.round))]
    pub fn step(&mut self) -> TraceResult<Option<RoundOutcome>> {
        profiling::scope!("Engine::step");
        if self.round >= self.cfg.rounds {
            self.phase = Phase::Done;
            return Ok(None);
        }
        let round = self.round;

        self.phase = Phase::Searching(round);
        let outcome = match self.find_best_step()? {
            Some(best) => {
                self.phase = Phase::Refining(round);
                let refined = self.refine_step(best)?;
                debug!(
                    attempts = refined.attempts,
                    improvements = refined.improvements,
                    distance = refined.step.distance,
                    "refined"
                );
                self.phase = Phase::Deciding(round);
                self.decide(refined.step)
            }
            None => RoundOutcome::Skipped,
        };

        self.round += 1;
        if self.round >= self.cfg.rounds {
            self.phase = Phase::Done;
        }

        match &outcome {
            RoundOutcome::Accepted(step) => debug!(distance = step.distance, shapes = self.primitives.len(), "accepted"),
            RoundOutcome::Skipped => debug!(distance = self.state.distance(), "skipped"),
        }
        Ok(Some(outcome))
    }

    /// apply the refined step only if it strictly beats the current state
    fn decide(&mut self, step: Step) -> RoundOutcome {
        if step.distance < self.state.distance() {
            self.state = step.apply(&self.state, &self.renderer);
            self.primitives.push(step.to_primitive());
            RoundOutcome::Accepted(step)
        } else {
            RoundOutcome::Skipped
        }
    }

    /// run every remaining round. `on_round` gets the index of the finished round and the
    /// accepted step, if any.
    pub fn run<F>(&mut self, mut on_round: F) -> TraceResult<()>
    where
        F: FnMut(u64, Option<&Step>),
    {
        while let Some(outcome) = self.step()? {
            on_round(self.round - 1, outcome.step());
        }
        info!(
            rounds = self.round,
            shapes = self.primitives.len(),
            distance = self.state.distance(),
            "search finished"
        );
        Ok(())
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// rounds completed so far
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn is_done(&self) -> bool {
        self.round >= self.cfg.rounds
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn fill(&self) -> [u8; 3] {
        self.fill
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_distance(self.state.distance(), self.baseline_distance)
    }
}
