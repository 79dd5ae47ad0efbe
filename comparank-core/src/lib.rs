/// comparank-core: ratings from pairwise comparisons.
///
/// Match list → ELO or Bradley-Terry scores → bootstrap medians with 95%
/// intervals. No IO: callers load matches however they like and hand over a
/// slice.
///
/// Entities are identified by name. Each match records who was shown as
/// `model_a` / `model_b` and an ordinal outcome (2 = A wins, 1 = draw,
/// 0 = B wins).
///
/// # Quick start
///
/// ```rust
/// use comparank_core::{compute_bootstrap_scores, BootstrapConfig, EloRanker, Match, MatchScore, Ranker};
///
/// let matches = vec![
///     Match::new("gpt", "llama", MatchScore::AWins),
///     Match::new("llama", "mistral", MatchScore::BWins),
///     Match::new("gpt", "mistral", MatchScore::Draw),
/// ];
///
/// let scores = EloRanker::default().compute_scores(&matches);
/// assert_eq!(scores.models().next(), Some("gpt"));
///
/// let config = BootstrapConfig::default().with_samples(50).with_seed(7);
/// let table = compute_bootstrap_scores(&matches, EloRanker::default, &config).unwrap();
///
/// for row in &table.rows {
///     println!("{}: {:.1} [{:.1}, {:.1}]", row.model, row.median, row.p2_5, row.p97_5);
/// }
/// ```

pub mod bootstrap;
pub mod bradley_terry;
pub mod constants;
pub mod elo;
pub mod error;
pub mod pairwise;
pub mod pipeline;
pub mod ranker;
pub mod types;

// Re-export primary public API at crate root.
pub use bootstrap::{aggregate_samples, collect_series, compute_bootstrap_scores, resample_matches, BootstrapConfig};
pub use bradley_terry::{FitReport, MaximumLikelihoodRanker};
pub use elo::{expected_score, EloRanker};
pub use error::RankError;
pub use pairwise::{win_rates, PairCounts, PairRow, PairwiseAggregate, WinRate};
pub use pipeline::{CategoryRanking, PipelineConfig, RankingMethod, RankingPipeline};
pub use ranker::{Ranker, RankerConfig};
pub use types::{BootstrapRow, BootstrapTable, EntityId, Match, MatchScore, ScoreTable, ScoredEntity};
