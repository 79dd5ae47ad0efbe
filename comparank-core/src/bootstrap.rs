/// Bootstrap confidence intervals for ranker scores.
///
/// Each iteration resamples the match list with replacement, scores it with
/// a fresh ranker and records the resulting table. Per-entity medians and
/// 95% intervals are then taken over all iterations.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_BOOTSTRAP_SAMPLES, LOWER_QUANTILE, UPPER_QUANTILE};
use crate::error::RankError;
use crate::ranker::Ranker;
use crate::types::{BootstrapRow, BootstrapTable, EntityId, EntityIndex, Match, ScoreTable};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapConfig {
    /// Number of resamples (default 100).
    pub samples: usize,
    /// Master seed. `None` draws one from the thread RNG.
    pub seed: Option<u64>,
    /// Run iterations on the rayon pool.
    pub parallel: bool,
    /// Wall-clock budget. Iterations not started when it runs out are skipped.
    pub deadline: Option<Duration>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            samples: DEFAULT_BOOTSTRAP_SAMPLES,
            seed: None,
            parallel: false,
            deadline: None,
        }
    }
}

impl BootstrapConfig {
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// ─── Resampling ──────────────────────────────────────────────────────

/// Draw `matches.len()` matches uniformly with replacement, keeping the draw
/// order. Order matters for order-sensitive rankers.
pub fn resample_matches<R: Rng + ?Sized>(matches: &[Match], rng: &mut R) -> Vec<Match> {
    if matches.is_empty() {
        return Vec::new();
    }
    (0..matches.len())
        .map(|_| matches[rng.random_range(0..matches.len())].clone())
        .collect()
}

/// Run the bootstrap: `config.samples` resamples, each scored by a ranker
/// fresh from `factory`.
///
/// Entities missing from a resample are counted at the ranker's
/// `default_score` for that iteration. With a seed the result is
/// reproducible, whether or not iterations run in parallel.
pub fn compute_bootstrap_scores<R, F>(
    matches: &[Match],
    factory: F,
    config: &BootstrapConfig,
) -> Result<BootstrapTable, RankError>
where
    R: Ranker + Send,
    F: Fn() -> R + Sync,
{
    if config.samples == 0 {
        return Err(RankError::NoBootstrapSamples);
    }
    if matches.is_empty() {
        return Ok(BootstrapTable::default());
    }

    let default_score = factory().config().default_score;

    // Seeds are drawn up front so each iteration's stream is fixed no
    // matter which thread runs it.
    let mut master = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::seed_from_u64(rand::rng().random()),
    };
    let seeds: Vec<u64> = (0..config.samples).map(|_| master.random()).collect();

    let deadline = config.deadline.map(|d| Instant::now() + d);
    let total = seeds.len();
    let done = AtomicUsize::new(0);
    let report_every = (total / 10).max(1);

    let run_one = |seed: u64| -> Option<ScoreTable> {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let sample = resample_matches(matches, &mut rng);
        let scores = factory().compute_scores(&sample);

        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % report_every == 0 || finished == total {
            debug!(finished, total, "bootstrap progress");
        }
        Some(scores)
    };

    let tables: Vec<ScoreTable> = if config.parallel {
        seeds.par_iter().filter_map(|&seed| run_one(seed)).collect()
    } else {
        seeds.iter().filter_map(|&seed| run_one(seed)).collect()
    };

    if tables.len() < total {
        warn!(
            completed = tables.len(),
            requested = total,
            "bootstrap deadline reached; aggregating completed samples only"
        );
    }

    Ok(aggregate_samples(&tables, default_score))
}

// ─── Aggregation ─────────────────────────────────────────────────────

/// One score series per entity, aligned across `samples`.
///
/// Entities are the union over all samples in order of first appearance.
/// An entity absent from a sample gets `default_score` at that position.
pub fn collect_series(samples: &[ScoreTable], default_score: f64) -> Vec<(EntityId, Vec<f64>)> {
    let mut index = EntityIndex::new();
    for table in samples {
        for entry in table {
            index.get_or_insert(&entry.model);
        }
    }

    let mut series = vec![vec![default_score; samples.len()]; index.len()];
    for (i, table) in samples.iter().enumerate() {
        for entry in table {
            if let Some(idx) = index.get(&entry.model) {
                series[idx][i] = entry.score;
            }
        }
    }

    index.ids().iter().cloned().zip(series).collect()
}

/// Reduce per-iteration tables to medians and 95% intervals, sorted by
/// median descending.
pub fn aggregate_samples(samples: &[ScoreTable], default_score: f64) -> BootstrapTable {
    let mut rows: Vec<BootstrapRow> = collect_series(samples, default_score)
        .into_iter()
        .map(|(model, mut values)| {
            values.sort_by(f64::total_cmp);
            BootstrapRow {
                model,
                median: median(&values),
                p2_5: quantile(&values, LOWER_QUANTILE),
                p97_5: quantile(&values, UPPER_QUANTILE),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.median.partial_cmp(&a.median).unwrap_or(std::cmp::Ordering::Equal));
    BootstrapTable {
        rows,
        samples: samples.len(),
    }
}

/// Median of sorted values; mean of the two middle ones for even lengths.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Nearest-rank quantile of sorted values: the element at `q * (n - 1)`,
/// rounded half to even. Always an observed value.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).round_ties_even();
    sorted[(pos as usize).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bradley_terry::MaximumLikelihoodRanker;
    use crate::elo::EloRanker;
    use crate::types::{MatchScore, ScoredEntity};

    fn table(entries: &[(&str, f64)]) -> ScoreTable {
        ScoreTable::from_unsorted(
            entries
                .iter()
                .map(|&(model, score)| ScoredEntity { model: model.to_string(), score })
                .collect(),
        )
    }

    fn sample_matches() -> Vec<Match> {
        let mut matches = Vec::new();
        for _ in 0..6 {
            matches.push(Match::new("a", "b", MatchScore::AWins));
            matches.push(Match::new("b", "c", MatchScore::AWins));
            matches.push(Match::new("a", "c", MatchScore::AWins));
        }
        matches.push(Match::new("c", "a", MatchScore::AWins));
        matches.push(Match::new("b", "a", MatchScore::Draw));
        matches
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_quantile_nearest_rank() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        // 0.025 * 99 = 2.475 -> 2, 0.975 * 99 = 96.525 -> 97
        assert_eq!(quantile(&values, LOWER_QUANTILE), 2.0);
        assert_eq!(quantile(&values, UPPER_QUANTILE), 97.0);
        assert_eq!(quantile(&[5.0], 0.975), 5.0);
        // Exact halves round to even: 0.5 * 3 = 1.5 -> 2
        assert_eq!(quantile(&[0.0, 1.0, 2.0, 3.0], 0.5), 2.0);
    }

    #[test]
    fn test_missing_entity_backfilled_with_default() {
        let mut samples: Vec<ScoreTable> = (0..99).map(|_| table(&[("x", 1100.0)])).collect();
        samples.push(table(&[("x", 1100.0), ("y", 1200.0)]));

        let result = aggregate_samples(&samples, 1000.0);
        assert_eq!(result.samples, 100);

        let y = result.get("y").unwrap();
        assert_eq!(y.median, 1000.0);
        assert_eq!(y.p2_5, 1000.0);
        assert_eq!(y.p97_5, 1000.0);
        assert_eq!(result.rows[0].model, "x");
    }

    #[test]
    fn test_collect_series_union_order() {
        let samples = vec![table(&[("b", 2.0), ("a", 1.0)]), table(&[("c", 5.0), ("a", 3.0)])];
        let series = collect_series(&samples, 0.0);
        let names: Vec<&str> = series.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(series[0].1, vec![2.0, 0.0]);
        assert_eq!(series[1].1, vec![1.0, 3.0]);
        assert_eq!(series[2].1, vec![0.0, 5.0]);
    }

    #[test]
    fn test_resample_keeps_length_and_membership() {
        let matches = sample_matches();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = resample_matches(&matches, &mut rng);
        assert_eq!(sample.len(), matches.len());
        assert!(sample.iter().all(|m| matches.contains(m)));
        assert!(resample_matches(&[], &mut rng).is_empty());
    }

    #[test]
    fn test_zero_samples_is_an_error() {
        let config = BootstrapConfig::default().with_samples(0);
        let result = compute_bootstrap_scores(&sample_matches(), EloRanker::default, &config);
        assert_eq!(result, Err(RankError::NoBootstrapSamples));
    }

    #[test]
    fn test_empty_input_gives_empty_table() {
        let config = BootstrapConfig::default().with_samples(10);
        let result = compute_bootstrap_scores(&[], EloRanker::default, &config).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let matches = sample_matches();
        let config = BootstrapConfig::default().with_samples(30).with_seed(42);
        let first = compute_bootstrap_scores(&matches, EloRanker::default, &config).unwrap();
        let second = compute_bootstrap_scores(&matches, EloRanker::default, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.samples, 30);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let matches = sample_matches();
        let config = BootstrapConfig::default().with_samples(40).with_seed(3);
        let sequential =
            compute_bootstrap_scores(&matches, MaximumLikelihoodRanker::default, &config).unwrap();
        let parallel = compute_bootstrap_scores(
            &matches,
            MaximumLikelihoodRanker::default,
            &config.clone().with_parallel(true),
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_interval_brackets_median() {
        let matches = sample_matches();
        let config = BootstrapConfig::default().with_samples(50).with_seed(11);
        let result = compute_bootstrap_scores(&matches, EloRanker::default, &config).unwrap();

        assert_eq!(result.len(), 3);
        for row in &result.rows {
            assert!(row.p2_5 <= row.median && row.median <= row.p97_5, "{row:?}");
        }
        for pair in result.rows.windows(2) {
            assert!(pair[0].median >= pair[1].median);
        }
        assert_eq!(result.rows[0].model, "a");
    }

    #[test]
    fn test_expired_deadline_skips_iterations() {
        let config = BootstrapConfig::default()
            .with_samples(20)
            .with_seed(1)
            .with_deadline(Duration::ZERO);
        let result = compute_bootstrap_scores(&sample_matches(), EloRanker::default, &config).unwrap();
        assert_eq!(result.samples, 0);
        assert!(result.is_empty());
    }
}
