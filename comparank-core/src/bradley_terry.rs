/// Bradley-Terry ratings by weighted logistic regression.
///
/// Every pair of entities that met contributes two weighted rows to an
/// intercept-free logistic design; the fitted coefficients are rescaled into
/// ELO-like units. Unlike the ELO ranker this is order-independent.
use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::constants::{
    DEFAULT_MAX_ITER, DEFAULT_TOLERANCE, HESSIAN_JITTER, LOGISTIC_BASE, MAX_LINE_SEARCH_STEPS,
};
use crate::error::RankError;
use crate::pairwise::PairwiseAggregate;
use crate::ranker::{Ranker, RankerConfig};
use crate::types::{EntityId, Match, ScoreTable, ScoredEntity};

/// Armijo sufficient-decrease constant for the line search.
const ARMIJO: f64 = 1e-4;

/// One weighted observation of the design. The feature vector is
/// `+ln(base)` at column `x`, `-ln(base)` at column `y` and zero elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignRow {
    pub x: usize,
    pub y: usize,
    /// `true` encodes "x beat y".
    pub positive: bool,
    pub weight: f64,
}

/// Sparse logistic design built from pairwise counts.
#[derive(Debug, Clone, Default)]
pub struct DesignMatrix {
    /// One column per entity.
    pub columns: Vec<EntityId>,
    pub rows: Vec<DesignRow>,
}

impl DesignMatrix {
    /// Two rows per pair that met: "x beat y" weighted `2*wins + draws`, and
    /// "y beat x" weighted `2*losses + draws`. A draw counts as half a win
    /// for each side.
    pub fn from_aggregate(aggregate: &PairwiseAggregate) -> Self {
        let mut rows = Vec::with_capacity(aggregate.num_pairs() * 2);
        for (x, y, counts) in aggregate.cells() {
            rows.push(DesignRow {
                x,
                y,
                positive: true,
                weight: (2 * counts.wins + counts.draws) as f64,
            });
            rows.push(DesignRow {
                x,
                y,
                positive: false,
                weight: (2 * counts.losses + counts.draws) as f64,
            });
        }
        DesignMatrix {
            columns: aggregate.entities().to_vec(),
            rows,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.rows.iter().map(|r| r.weight).sum()
    }

    /// Dense feature matrix, one row per design row.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let feature = LOGISTIC_BASE.ln();
        let mut dense = DMatrix::zeros(self.rows.len(), self.columns.len());
        for (i, row) in self.rows.iter().enumerate() {
            dense[(i, row.x)] = feature;
            dense[(i, row.y)] = -feature;
        }
        dense
    }
}

/// Diagnostics of the last logistic fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitReport {
    /// Newton steps taken.
    pub iterations: usize,
    pub converged: bool,
    /// Max-abs gradient of the mean log-loss at the returned coefficients.
    pub gradient_norm: f64,
    /// Connected components of the comparison graph. Ratings in different
    /// components are not comparable.
    pub components: usize,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn mean_log_loss(rows: &[DesignRow], coef: &DVector<f64>, feature: f64, total_weight: f64) -> f64 {
    let mut loss = 0.0;
    for row in rows {
        let z = feature * (coef[row.x] - coef[row.y]);
        loss += row.weight * if row.positive { softplus(-z) } else { softplus(z) };
    }
    loss / total_weight
}

fn gradient_and_hessian(
    rows: &[DesignRow],
    coef: &DVector<f64>,
    feature: f64,
    total_weight: f64,
) -> (DVector<f64>, DMatrix<f64>) {
    let p = coef.len();
    let mut gradient = DVector::zeros(p);
    let mut hessian = DMatrix::zeros(p, p);

    for row in rows {
        if row.weight == 0.0 {
            continue;
        }
        let prob = sigmoid(feature * (coef[row.x] - coef[row.y]));
        let label = if row.positive { 1.0 } else { 0.0 };
        let w = row.weight / total_weight;

        let g = w * (prob - label) * feature;
        gradient[row.x] += g;
        gradient[row.y] -= g;

        let h = w * prob * (1.0 - prob) * feature * feature;
        hessian[(row.x, row.x)] += h;
        hessian[(row.y, row.y)] += h;
        hessian[(row.x, row.y)] -= h;
        hessian[(row.y, row.x)] -= h;
    }

    (gradient, hessian)
}

/// Component label per column, components numbered in order of first column.
fn connected_components(num_columns: usize, rows: &[DesignRow]) -> (Vec<usize>, usize) {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..num_columns).collect();
    for row in rows {
        let (rx, ry) = (find(&mut parent, row.x), find(&mut parent, row.y));
        if rx != ry {
            parent[rx.max(ry)] = rx.min(ry);
        }
    }

    let mut labels = vec![usize::MAX; num_columns];
    let mut root_label = vec![usize::MAX; num_columns];
    let mut count = 0;
    for i in 0..num_columns {
        let root = find(&mut parent, i);
        if root_label[root] == usize::MAX {
            root_label[root] = count;
            count += 1;
        }
        labels[i] = root_label[root];
    }
    (labels, count)
}

/// Shift coefficients so each connected component has zero mean. The loss
/// is invariant to such shifts.
fn center_components(coef: &mut DVector<f64>, labels: &[usize], components: usize) {
    let mut sums = vec![0.0; components];
    let mut sizes = vec![0usize; components];
    for (i, &label) in labels.iter().enumerate() {
        sums[label] += coef[i];
        sizes[label] += 1;
    }
    for (i, &label) in labels.iter().enumerate() {
        coef[i] -= sums[label] / sizes[label] as f64;
    }
}

/// Unpenalized, intercept-free weighted logistic regression by Newton-Raphson.
///
/// Starts from zero and stops once the max-abs gradient drops below
/// `tolerance`, or after `max_iter` steps. The design is rank-deficient by
/// one shift per connected component; coefficients are returned with zero
/// mean inside each component.
pub fn fit_logistic(design: &DesignMatrix, max_iter: usize, tolerance: f64) -> (Vec<f64>, FitReport) {
    let p = design.num_columns();
    let rows = &design.rows;
    let feature = LOGISTIC_BASE.ln();
    let total_weight = design.total_weight();
    let (labels, components) = connected_components(p, rows);

    let mut coef = DVector::zeros(p);
    if p == 0 || total_weight <= 0.0 {
        let report = FitReport { iterations: 0, converged: true, gradient_norm: 0.0, components };
        return (coef.iter().copied().collect(), report);
    }

    let mut loss = mean_log_loss(rows, &coef, feature, total_weight);
    let mut iterations = 0;
    let mut converged = false;
    let mut gradient_norm;

    loop {
        let (gradient, mut hessian) = gradient_and_hessian(rows, &coef, feature, total_weight);
        gradient_norm = gradient.amax();
        if gradient_norm < tolerance {
            converged = true;
            break;
        }
        if iterations >= max_iter {
            break;
        }
        iterations += 1;

        let jitter = HESSIAN_JITTER * (hessian.trace() / p as f64).max(f64::MIN_POSITIVE);
        for i in 0..p {
            hessian[(i, i)] += jitter;
        }

        let step = match hessian.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&gradient),
            None => match hessian.lu().solve(&gradient) {
                Some(step) => step,
                None => break,
            },
        };

        // Backtracking line search on the mean log-loss.
        let slope = gradient.dot(&step);
        let mut t = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let candidate = &coef - &step * t;
            let candidate_loss = mean_log_loss(rows, &candidate, feature, total_weight);
            if candidate_loss <= loss - ARMIJO * t * slope {
                coef = candidate;
                loss = candidate_loss;
                accepted = true;
                break;
            }
            t *= 0.5;
        }
        if !accepted {
            break;
        }
        center_components(&mut coef, &labels, components);
    }

    let report = FitReport { iterations, converged, gradient_norm, components };
    (coef.iter().copied().collect(), report)
}

/// Maximum-likelihood (Bradley-Terry) ranker.
#[derive(Debug, Clone)]
pub struct MaximumLikelihoodRanker {
    config: RankerConfig,
    max_iter: usize,
    tolerance: f64,
    scores: ScoreTable,
    last_fit: Option<FitReport>,
}

impl MaximumLikelihoodRanker {
    pub fn new(config: RankerConfig) -> Self {
        MaximumLikelihoodRanker {
            config,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            scores: ScoreTable::default(),
            last_fit: None,
        }
    }

    /// Like `new`, but rejects a config that would make ratings meaningless.
    pub fn try_new(config: RankerConfig) -> Result<Self, RankError> {
        config.validate()?;
        Ok(MaximumLikelihoodRanker::new(config))
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Diagnostics of the last `compute_scores` call, `None` when there was
    /// nothing to fit.
    pub fn last_fit(&self) -> Option<&FitReport> {
        self.last_fit.as_ref()
    }
}

impl Default for MaximumLikelihoodRanker {
    fn default() -> Self {
        MaximumLikelihoodRanker::new(RankerConfig::default())
    }
}

impl Ranker for MaximumLikelihoodRanker {
    fn compute_scores(&mut self, matches: &[Match]) -> ScoreTable {
        let aggregate = PairwiseAggregate::from_matches(matches);
        if aggregate.num_entities() < 2 {
            self.scores = ScoreTable::default();
            self.last_fit = None;
            return self.get_scores();
        }

        let design = DesignMatrix::from_aggregate(&aggregate);
        let (coef, report) = fit_logistic(&design, self.max_iter, self.tolerance);

        if !report.converged {
            warn!(
                iterations = report.iterations,
                gradient_norm = report.gradient_norm,
                "logistic fit stopped before convergence; returning best coefficients"
            );
        }
        if report.components > 1 {
            warn!(
                components = report.components,
                "comparison graph is disconnected; ratings are not comparable across components"
            );
        }

        let entries = design
            .columns
            .into_iter()
            .zip(coef)
            .map(|(model, c)| ScoredEntity {
                model,
                score: self.config.scale * c + self.config.default_score,
            })
            .collect();

        self.scores = ScoreTable::from_unsorted(entries);
        self.last_fit = Some(report);
        self.get_scores()
    }

    fn get_scores(&self) -> ScoreTable {
        self.scores.clone()
    }

    fn config(&self) -> &RankerConfig {
        &self.config
    }
}
