/// End-to-end ranking: pick the data sources, filter by category, score with
/// the configured method and wrap it in the bootstrap.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::bootstrap::{compute_bootstrap_scores, BootstrapConfig};
use crate::bradley_terry::MaximumLikelihoodRanker;
use crate::constants::{DEFAULT_K_FACTOR, DEFAULT_MAX_ITER, DEFAULT_MIN_CATEGORY_MATCHES};
use crate::elo::EloRanker;
use crate::error::RankError;
use crate::pairwise::PairwiseAggregate;
use crate::ranker::{Ranker, RankerConfig};
use crate::types::{BootstrapTable, Match, ScoreTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RankingMethod {
    /// Incremental ELO over matches in input order.
    #[default]
    Elo,
    /// Bradley-Terry fit by logistic regression.
    #[cfg_attr(feature = "serde", serde(rename = "ml"))]
    MaximumLikelihood,
}

impl FromStr for RankingMethod {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elo" | "elo_random" => Ok(RankingMethod::Elo),
            "ml" | "maximum_likelihood" => Ok(RankingMethod::MaximumLikelihood),
            "elo_ordered" => Err(RankError::MethodNotImplemented(s.to_string())),
            _ => Err(RankError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for RankingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingMethod::Elo => write!(f, "elo"),
            RankingMethod::MaximumLikelihood => write!(f, "ml"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub method: RankingMethod,
    pub include_votes: bool,
    pub include_reactions: bool,
    pub ranker: RankerConfig,
    /// ELO only.
    pub k_factor: f64,
    /// Maximum-likelihood only.
    pub max_iter: usize,
    pub bootstrap: BootstrapConfig,
    /// Known categories. `None` means every tag present in the data.
    pub categories: Option<Vec<String>>,
    pub min_category_matches: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            method: RankingMethod::default(),
            include_votes: true,
            include_reactions: false,
            ranker: RankerConfig::default(),
            k_factor: DEFAULT_K_FACTOR,
            max_iter: DEFAULT_MAX_ITER,
            bootstrap: BootstrapConfig::default(),
            categories: None,
            min_category_matches: DEFAULT_MIN_CATEGORY_MATCHES,
        }
    }
}

impl PipelineConfig {
    /// Reject numeric settings the rankers cannot work with.
    pub fn validate(&self) -> Result<(), RankError> {
        self.ranker.validate()?;
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(RankError::InvalidConfig(format!(
                "k_factor must be a positive finite number, got {}",
                self.k_factor
            )));
        }
        Ok(())
    }
}

/// Bootstrap result for one category.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryRanking {
    pub category: String,
    /// Matches carrying the category.
    pub matches: usize,
    pub table: BootstrapTable,
}

#[derive(Debug, Clone)]
pub struct RankingPipeline {
    config: PipelineConfig,
    matches: Vec<Match>,
}

impl RankingPipeline {
    /// Build a pipeline over the enabled sources, votes first.
    pub fn new(config: PipelineConfig, votes: Vec<Match>, reactions: Vec<Match>) -> Result<Self, RankError> {
        if !config.include_votes && !config.include_reactions {
            return Err(RankError::NoDataSource);
        }
        config.validate()?;

        let mut matches = Vec::new();
        if config.include_votes {
            matches.extend(votes);
        }
        if config.include_reactions {
            matches.extend(reactions);
        }

        Ok(RankingPipeline { config, matches })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Known categories: the configured list, otherwise every tag in the data
    /// in sorted order.
    pub fn categories(&self) -> Vec<String> {
        match &self.config.categories {
            Some(categories) => categories.clone(),
            None => self
                .matches
                .iter()
                .flat_map(|m| m.categories.iter().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// All matches, or the ones tagged with `category`.
    pub fn match_list(&self, category: Option<&str>) -> Result<Vec<Match>, RankError> {
        let Some(category) = category else {
            return Ok(self.matches.clone());
        };
        if !self.categories().iter().any(|c| c == category) {
            return Err(RankError::UnknownCategory(category.to_string()));
        }
        Ok(self
            .matches
            .iter()
            .filter(|m| m.has_category(category))
            .cloned()
            .collect())
    }

    fn elo(&self) -> EloRanker {
        EloRanker::new(self.config.ranker).with_k_factor(self.config.k_factor)
    }

    fn maximum_likelihood(&self) -> MaximumLikelihoodRanker {
        MaximumLikelihoodRanker::new(self.config.ranker).with_max_iter(self.config.max_iter)
    }

    /// One pass of the configured ranker, without resampling.
    pub fn scores(&self, category: Option<&str>) -> Result<ScoreTable, RankError> {
        let matches = self.match_list(category)?;
        let table = match self.config.method {
            RankingMethod::Elo => self.elo().compute_scores(&matches),
            RankingMethod::MaximumLikelihood => self.maximum_likelihood().compute_scores(&matches),
        };
        Ok(table)
    }

    /// Pairwise counts over all matches or one category.
    pub fn pairwise(&self, category: Option<&str>) -> Result<PairwiseAggregate, RankError> {
        Ok(PairwiseAggregate::from_matches(&self.match_list(category)?))
    }

    /// Bootstrap an already filtered match list, e.g. from `match_list`.
    pub fn run_matches(&self, matches: &[Match]) -> Result<BootstrapTable, RankError> {
        info!(
            method = %self.config.method,
            matches = matches.len(),
            samples = self.config.bootstrap.samples,
            "running bootstrap"
        );
        match self.config.method {
            RankingMethod::Elo => compute_bootstrap_scores(matches, || self.elo(), &self.config.bootstrap),
            RankingMethod::MaximumLikelihood => {
                compute_bootstrap_scores(matches, || self.maximum_likelihood(), &self.config.bootstrap)
            }
        }
    }

    /// Bootstrap table over every match.
    pub fn run(&self) -> Result<BootstrapTable, RankError> {
        self.run_matches(&self.matches)
    }

    pub fn run_category(&self, category: &str) -> Result<BootstrapTable, RankError> {
        let matches = self.match_list(Some(category))?;
        self.run_matches(&matches)
    }

    /// Bootstrap every known category with enough matches.
    pub fn run_all_categories(&self) -> Result<Vec<CategoryRanking>, RankError> {
        let mut rankings = Vec::new();
        for category in self.categories() {
            let matches = self.match_list(Some(&category))?;
            if matches.len() < self.config.min_category_matches {
                info!(
                    category = %category,
                    matches = matches.len(),
                    min = self.config.min_category_matches,
                    "skipping category with too few matches"
                );
                continue;
            }
            let table = self.run_matches(&matches)?;
            rankings.push(CategoryRanking {
                category,
                matches: matches.len(),
                table,
            });
        }
        Ok(rankings)
    }
}
