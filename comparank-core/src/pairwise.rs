/// Pairwise match statistics.
///
/// Folds every match into one cell per unordered pair of distinct entities,
/// whichever side each model was shown on. Feeds the maximum-likelihood
/// design and the match-count / win-rate heatmap data.
use std::collections::BTreeMap;

use crate::types::{EntityId, EntityIndex, Match, MatchScore};

/// Match counts between two entities, oriented from the first one's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairCounts {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

impl PairCounts {
    pub fn total(&self) -> u64 {
        self.wins + self.losses + self.draws
    }

    /// The same counts seen from the opponent.
    pub fn reversed(&self) -> Self {
        PairCounts {
            wins: self.losses,
            losses: self.wins,
            draws: self.draws,
        }
    }

    /// Share of decisive matches won. `None` when every match was a draw.
    pub fn win_ratio(&self) -> Option<f64> {
        let decisive = self.wins + self.losses;
        if decisive == 0 {
            None
        } else {
            Some(self.wins as f64 / decisive as f64)
        }
    }

    fn record(&mut self, score: MatchScore) {
        match score {
            MatchScore::AWins => self.wins += 1,
            MatchScore::BWins => self.losses += 1,
            MatchScore::Draw => self.draws += 1,
        }
    }
}

/// One oriented row of the pairwise table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairRow {
    pub model_a: EntityId,
    pub model_b: EntityId,
    pub a_wins: u64,
    pub b_wins: u64,
    pub draws: u64,
    pub count: u64,
    pub a_win_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PairwiseAggregate {
    index: EntityIndex,
    /// Keyed by `(lo, hi)` entity indices, counts oriented from `lo`.
    cells: BTreeMap<(usize, usize), PairCounts>,
}

impl PairwiseAggregate {
    /// Aggregate `matches`, dropping self-matches.
    pub fn from_matches(matches: &[Match]) -> Self {
        let mut index = EntityIndex::new();
        let mut cells: BTreeMap<(usize, usize), PairCounts> = BTreeMap::new();

        for m in matches.iter().filter(|m| !m.is_self_match()) {
            let a = index.get_or_insert(&m.model_a);
            let b = index.get_or_insert(&m.model_b);

            let (key, score) = if a < b {
                ((a, b), m.score)
            } else {
                ((b, a), m.score.reversed())
            };
            cells.entry(key).or_default().record(score);
        }

        PairwiseAggregate { index, cells }
    }

    /// Entities that played at least one non-self match, in order of first appearance.
    pub fn entities(&self) -> &[EntityId] {
        self.index.ids()
    }

    pub fn num_entities(&self) -> usize {
        self.index.len()
    }

    pub fn num_pairs(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Counts between `x` and `y`, from `x`'s point of view.
    pub fn counts(&self, x: &str, y: &str) -> Option<PairCounts> {
        let xi = self.index.get(x)?;
        let yi = self.index.get(y)?;
        if xi < yi {
            self.cells.get(&(xi, yi)).copied()
        } else {
            self.cells.get(&(yi, xi)).map(PairCounts::reversed)
        }
    }

    /// Index-level view: `(lo, hi, counts from lo)` for every pair that met.
    pub(crate) fn cells(&self) -> impl Iterator<Item = (usize, usize, PairCounts)> + '_ {
        self.cells.iter().map(|(&(x, y), &counts)| (x, y, counts))
    }

    /// Both orientations of every pair, for count and win-rate heatmaps.
    pub fn rows(&self) -> Vec<PairRow> {
        let mut rows = Vec::with_capacity(self.cells.len() * 2);
        for (x, y, counts) in self.cells() {
            rows.push(self.row(x, y, counts));
            rows.push(self.row(y, x, counts.reversed()));
        }
        rows
    }

    fn row(&self, a: usize, b: usize, counts: PairCounts) -> PairRow {
        PairRow {
            model_a: self.index.to_id(a).to_string(),
            model_b: self.index.to_id(b).to_string(),
            a_wins: counts.wins,
            b_wins: counts.losses,
            draws: counts.draws,
            count: counts.total(),
            a_win_ratio: counts.win_ratio(),
        }
    }
}

/// Decisive-match record of one entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WinRate {
    pub model: EntityId,
    /// Decisive (non-draw) matches played.
    pub matches: u64,
    pub wins: u64,
    /// Percentage of decisive matches won.
    pub win_rate: f64,
}

/// Per-entity win rates over decisive matches, most active entities first.
///
/// Draws and self-matches are ignored. Entities that never won are kept with
/// a zero win rate.
pub fn win_rates(matches: &[Match]) -> Vec<WinRate> {
    let mut index = EntityIndex::new();
    let mut played: Vec<u64> = Vec::new();
    let mut wins: Vec<u64> = Vec::new();

    for m in matches {
        if m.is_self_match() || m.score == MatchScore::Draw {
            continue;
        }
        for model in [&m.model_a, &m.model_b] {
            let idx = index.get_or_insert(model);
            if idx == played.len() {
                played.push(0);
                wins.push(0);
            }
            played[idx] += 1;
        }
        let winner = if m.score == MatchScore::AWins { &m.model_a } else { &m.model_b };
        if let Some(idx) = index.get(winner) {
            wins[idx] += 1;
        }
    }

    let mut rates: Vec<WinRate> = index
        .ids()
        .iter()
        .enumerate()
        .map(|(idx, model)| WinRate {
            model: model.clone(),
            matches: played[idx],
            wins: wins[idx],
            win_rate: 100.0 * wins[idx] as f64 / played[idx] as f64,
        })
        .collect();
    rates.sort_by(|a, b| b.matches.cmp(&a.matches));
    rates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(a: &str, b: &str, score: MatchScore) -> Match {
        Match::new(a, b, score)
    }

    #[test]
    fn test_orientations_fold_into_one_cell() {
        let agg = PairwiseAggregate::from_matches(&[
            m("x", "y", MatchScore::AWins),
            m("y", "x", MatchScore::AWins),
            m("y", "x", MatchScore::BWins),
            m("x", "y", MatchScore::Draw),
        ]);

        assert_eq!(agg.num_pairs(), 1);
        let xy = agg.counts("x", "y").unwrap();
        assert_eq!(xy, PairCounts { wins: 2, losses: 1, draws: 1 });
        assert_eq!(agg.counts("y", "x").unwrap(), xy.reversed());
    }

    #[test]
    fn test_aggregation_is_orientation_independent() {
        let raw = vec![
            m("x", "y", MatchScore::AWins),
            m("x", "y", MatchScore::AWins),
            m("y", "z", MatchScore::Draw),
            m("z", "x", MatchScore::BWins),
        ];
        let mirrored: Vec<Match> = raw.iter().map(Match::mirrored).collect();

        let a = PairwiseAggregate::from_matches(&raw);
        let b = PairwiseAggregate::from_matches(&mirrored);
        for (x, y) in [("x", "y"), ("y", "z"), ("x", "z"), ("z", "y")] {
            assert_eq!(a.counts(x, y), b.counts(x, y), "pair {x}/{y}");
        }
    }

    #[test]
    fn test_self_matches_are_excluded() {
        let agg = PairwiseAggregate::from_matches(&[
            m("x", "x", MatchScore::AWins),
            m("x", "y", MatchScore::Draw),
        ]);
        assert_eq!(agg.num_pairs(), 1);
        assert_eq!(agg.counts("x", "x"), None);
        assert_eq!(agg.counts("x", "y").unwrap().total(), 1);

        let only_self = PairwiseAggregate::from_matches(&[m("x", "x", MatchScore::Draw)]);
        assert!(only_self.is_empty());
        assert_eq!(only_self.num_entities(), 0);
    }

    #[test]
    fn test_rows_cover_both_orientations() {
        let agg = PairwiseAggregate::from_matches(&[
            m("x", "y", MatchScore::AWins),
            m("x", "y", MatchScore::AWins),
            m("x", "y", MatchScore::BWins),
            m("x", "z", MatchScore::Draw),
        ]);
        let rows = agg.rows();
        assert_eq!(rows.len(), 4);

        let xy = rows.iter().find(|r| r.model_a == "x" && r.model_b == "y").unwrap();
        assert_eq!((xy.a_wins, xy.b_wins, xy.draws, xy.count), (2, 1, 0, 3));
        assert!((xy.a_win_ratio.unwrap() - 2.0 / 3.0).abs() < 1e-12);

        let zx = rows.iter().find(|r| r.model_a == "z" && r.model_b == "x").unwrap();
        assert_eq!(zx.count, 1);
        assert_eq!(zx.a_win_ratio, None);
    }

    #[test]
    fn test_win_rates() {
        let rates = win_rates(&[
            m("x", "y", MatchScore::AWins),
            m("x", "z", MatchScore::BWins),
            m("x", "y", MatchScore::AWins),
            m("y", "z", MatchScore::Draw),
            m("z", "z", MatchScore::AWins),
        ]);

        assert_eq!(rates[0].model, "x");
        assert_eq!((rates[0].matches, rates[0].wins), (3, 2));
        assert!((rates[0].win_rate - 200.0 / 3.0).abs() < 1e-9);

        let y = rates.iter().find(|r| r.model == "y").unwrap();
        assert_eq!((y.matches, y.wins, y.win_rate), (2, 0, 0.0));
        let z = rates.iter().find(|r| r.model == "z").unwrap();
        assert_eq!((z.matches, z.wins), (1, 1));
    }
}
