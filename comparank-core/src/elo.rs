/// Incremental ELO rating.
///
/// Ratings are updated match by match in input order, so the result depends
/// on that order. Resamples must be replayed as drawn, never re-sorted.
use tracing::trace;

use crate::constants::{DEFAULT_K_FACTOR, ESTABLISHED_MATCH_COUNT, HIGH_RATING_THRESHOLD, LOGISTIC_BASE};
use crate::error::RankError;
use crate::ranker::{Ranker, RankerConfig};
use crate::types::{EntityIndex, Match, ScoreTable, ScoredEntity};

/// Expected result for the side whose rating exceeds the other's by `diff`.
///
/// The gap is clamped to `[-scale, scale]`, which bounds the largest swing a
/// single match can cause.
pub fn expected_score(diff: f64, scale: f64) -> f64 {
    let clamped = diff.clamp(-scale, scale);
    1.0 / (1.0 + LOGISTIC_BASE.powf(-clamped / scale))
}

#[derive(Debug, Clone)]
pub struct EloRanker {
    config: RankerConfig,
    k_factor: f64,
    /// Entity name -> index into `ratings` / `games_played`.
    index: EntityIndex,
    ratings: Vec<f64>,
    games_played: Vec<usize>,
}

impl EloRanker {
    pub fn new(config: RankerConfig) -> Self {
        EloRanker {
            config,
            k_factor: DEFAULT_K_FACTOR,
            index: EntityIndex::new(),
            ratings: Vec::new(),
            games_played: Vec::new(),
        }
    }

    /// Like `new`, but rejects a config that would break the update rule.
    pub fn try_new(config: RankerConfig) -> Result<Self, RankError> {
        config.validate()?;
        Ok(EloRanker::new(config))
    }

    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Drop all entities and ratings.
    pub fn reset(&mut self) {
        self.index.clear();
        self.ratings.clear();
        self.games_played.clear();
    }

    pub fn rating(&self, model: &str) -> Option<f64> {
        self.index.get(model).map(|idx| self.ratings[idx])
    }

    pub fn games_played(&self, model: &str) -> Option<usize> {
        self.index.get(model).map(|idx| self.games_played[idx])
    }

    pub fn num_entities(&self) -> usize {
        self.index.len()
    }

    fn register(&mut self, model: &str) -> usize {
        let idx = self.index.get_or_insert(model);
        if idx == self.ratings.len() {
            self.ratings.push(self.config.default_score);
            self.games_played.push(0);
        }
        idx
    }

    /// K-factor for a match between `a` and `b`, from their state before it.
    fn step_size(&self, a: usize, b: usize) -> f64 {
        let top_rating = self.ratings[a].max(self.ratings[b]);
        let fewest_games = self.games_played[a].min(self.games_played[b]);

        if top_rating > HIGH_RATING_THRESHOLD {
            self.k_factor / 4.0
        } else if fewest_games > ESTABLISHED_MATCH_COUNT {
            self.k_factor / 2.0
        } else {
            self.k_factor
        }
    }

    /// Apply one match on top of the current state.
    ///
    /// Self-matches are ignored entirely: no registration, no rating change.
    pub fn record_match(&mut self, m: &Match) {
        if m.is_self_match() {
            trace!(model = %m.model_a, "skipping self-match");
            return;
        }

        let a = self.register(&m.model_a);
        let b = self.register(&m.model_b);

        let expected = expected_score(self.ratings[a] - self.ratings[b], self.config.scale);
        let observed = m.score.outcome();
        let k = self.step_size(a, b);

        self.ratings[a] += k * (observed - expected);
        self.ratings[b] += k * (expected - observed);
        self.games_played[a] += 1;
        self.games_played[b] += 1;
    }

    /// Apply matches in order on top of the current state.
    pub fn record_matches(&mut self, matches: &[Match]) {
        for m in matches {
            self.record_match(m);
        }
    }
}

impl Default for EloRanker {
    fn default() -> Self {
        EloRanker::new(RankerConfig::default())
    }
}

impl Ranker for EloRanker {
    fn compute_scores(&mut self, matches: &[Match]) -> ScoreTable {
        self.reset();
        self.record_matches(matches);
        self.get_scores()
    }

    fn get_scores(&self) -> ScoreTable {
        let entries = self
            .index
            .ids()
            .iter()
            .zip(&self.ratings)
            .map(|(model, &score)| ScoredEntity { model: model.clone(), score })
            .collect();
        ScoreTable::from_unsorted(entries)
    }

    fn config(&self) -> &RankerConfig {
        &self.config
    }
}
