use crate::error::{TraceError, TraceResult};
use crate::shape::ShapeKind;
use crate::step::{MAX_ALPHA, MIN_ALPHA};

/// engine-side knobs, derived from [`crate::settings::Settings`]
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub rounds: u64,       // total rounds; every round counts, accepted or not
    pub breadth: usize,    // random candidates sampled per round
    pub patience: usize,   // consecutive failed mutations before refinement stops
    pub alpha: f32,        // alpha every fresh candidate starts with
    pub mutate_alpha: bool,
    pub shape_kinds: Vec<ShapeKind>,
    pub seed: u64,         // master RNG seed; same seed + config = same run

    // return consistency violations as errors instead of only logging them
    pub strict_consistency: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rounds: 600,
            breadth: 150,
            patience: 25,
            alpha: 0.5,
            mutate_alpha: false,
            shape_kinds: vec![ShapeKind::Triangle],
            seed: 0xDEADBEEF,
            strict_consistency: cfg!(debug_assertions),
        }
    }
}

impl SearchConfig {
    /// fail fast on values that would make a run meaningless
    pub fn validate(&self) -> TraceResult<()> {
        if self.rounds == 0 {
            return Err(TraceError::configuration("round budget must be positive"));
        }
        if self.breadth == 0 {
            return Err(TraceError::configuration("candidate breadth must be positive"));
        }
        if self.patience == 0 {
            return Err(TraceError::configuration("refinement patience must be positive"));
        }
        if !(MIN_ALPHA..=MAX_ALPHA).contains(&self.alpha) {
            return Err(TraceError::configuration(format!(
                "alpha must lie in [{MIN_ALPHA}, {MAX_ALPHA}], got {}",
                self.alpha
            )));
        }
        if self.shape_kinds.is_empty() {
            return Err(TraceError::configuration("at least one shape kind must be enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SearchConfig::default().validate().unwrap();
    }

    #[test]
    fn non_positive_budgets_are_rejected() {
        let base = SearchConfig::default();
        for cfg in [
            SearchConfig { rounds: 0, ..base.clone() },
            SearchConfig { breadth: 0, ..base.clone() },
            SearchConfig { patience: 0, ..base.clone() },
            SearchConfig { alpha: 0.05, ..base.clone() },
            SearchConfig { shape_kinds: vec![], ..base.clone() },
        ] {
            assert!(matches!(cfg.validate(), Err(TraceError::Configuration(_))));
        }
    }
}
