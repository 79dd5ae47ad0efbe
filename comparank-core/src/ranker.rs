/// Contract shared by every comparison-to-score algorithm.
use crate::constants::{DEFAULT_SCALE, DEFAULT_SCORE};
use crate::error::RankError;
use crate::types::{Match, ScoreTable};

/// Configuration shared by all rankers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankerConfig {
    /// Logistic steepness divisor (rating points per factor-10 odds).
    pub scale: f64,
    /// Initial rating, and the value assumed for an entity missing from a
    /// bootstrap sample.
    pub default_score: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        RankerConfig {
            scale: DEFAULT_SCALE,
            default_score: DEFAULT_SCORE,
        }
    }
}

impl RankerConfig {
    /// `scale` must be finite and positive, `default_score` finite.
    pub fn validate(&self) -> Result<(), RankError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(RankError::InvalidConfig(format!(
                "scale must be a positive finite number, got {}",
                self.scale
            )));
        }
        if !self.default_score.is_finite() {
            return Err(RankError::InvalidConfig(format!(
                "default_score must be finite, got {}",
                self.default_score
            )));
        }
        Ok(())
    }
}

/// A scoring algorithm turning matches into one score per entity.
///
/// Implementations own their state exclusively. The bootstrap engine builds a
/// fresh instance per resample, so nothing leaks between samples.
pub trait Ranker {
    /// Score every entity appearing in `matches`, starting from fresh state.
    /// An empty (or self-match-only) input yields an empty table.
    fn compute_scores(&mut self, matches: &[Match]) -> ScoreTable;

    /// Last computed or accumulated scores, sorted descending. Never recomputes.
    fn get_scores(&self) -> ScoreTable;

    fn config(&self) -> &RankerConfig;
}
