use std::collections::HashMap;

use crate::error::RankError;

/// Opaque identifier of a ranked entity (a model name).
pub type EntityId = String;

/// Outcome of a single match, seen from `model_a`.
///
/// The discriminants form an ordinal scale so averaging and comparing scores
/// stays meaningful downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
#[repr(u8)]
pub enum MatchScore {
    BWins = 0,
    Draw = 1,
    AWins = 2,
}

impl MatchScore {
    /// Ordinal value: 2 = A wins, 1 = draw, 0 = B wins.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Observed result for `model_a`: 1.0, 0.5 or 0.0.
    pub fn outcome(self) -> f64 {
        self.value() as f64 / 2.0
    }

    /// The same result seen from `model_b`.
    pub fn reversed(self) -> Self {
        match self {
            MatchScore::AWins => MatchScore::BWins,
            MatchScore::BWins => MatchScore::AWins,
            MatchScore::Draw => MatchScore::Draw,
        }
    }
}

impl TryFrom<u8> for MatchScore {
    type Error = RankError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MatchScore::BWins),
            1 => Ok(MatchScore::Draw),
            2 => Ok(MatchScore::AWins),
            other => Err(RankError::InvalidScore(other)),
        }
    }
}

impl From<MatchScore> for u8 {
    fn from(score: MatchScore) -> Self {
        score.value()
    }
}

/// One pairwise comparison between two entities.
///
/// Built once by whoever supplies the data and only read by the engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Match {
    pub model_a: EntityId,
    pub model_b: EntityId,
    pub score: MatchScore,
    /// Source identifier (e.g. conversation pair id), if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub categories: Vec<String>,
}

impl Match {
    pub fn new(model_a: impl Into<EntityId>, model_b: impl Into<EntityId>, score: MatchScore) -> Self {
        Match {
            model_a: model_a.into(),
            model_b: model_b.into(),
            score,
            id: None,
            categories: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// A model compared against itself carries no ranking information.
    pub fn is_self_match(&self) -> bool {
        self.model_a == self.model_b
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Same real outcome with the two sides swapped.
    pub fn mirrored(&self) -> Self {
        Match {
            model_a: self.model_b.clone(),
            model_b: self.model_a.clone(),
            score: self.score.reversed(),
            id: self.id.clone(),
            categories: self.categories.clone(),
        }
    }
}

/// A single entry of a score table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredEntity {
    pub model: EntityId,
    pub score: f64,
}

/// Scores of one ranker run, sorted by score descending.
///
/// Ties keep the order in which entities were first seen by the ranker.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ScoreTable {
    entries: Vec<ScoredEntity>,
}

impl ScoreTable {
    /// Sort `entries` (given in first-appearance order) into a table.
    pub fn from_unsorted(mut entries: Vec<ScoredEntity>) -> Self {
        // sort_by is stable: equal scores keep first-appearance order
        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ScoreTable { entries }
    }

    pub fn get(&self, model: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.model == model).map(|e| e.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredEntity> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[ScoredEntity] {
        &self.entries
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.model.as_str())
    }

    pub fn into_map(self) -> HashMap<EntityId, f64> {
        self.entries.into_iter().map(|e| (e.model, e.score)).collect()
    }
}

impl<'a> IntoIterator for &'a ScoreTable {
    type Item = &'a ScoredEntity;
    type IntoIter = std::slice::Iter<'a, ScoredEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Bootstrap estimate for one entity: median and 95% interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapRow {
    pub model: EntityId,
    pub median: f64,
    #[cfg_attr(feature = "serde", serde(rename = "p2.5"))]
    pub p2_5: f64,
    #[cfg_attr(feature = "serde", serde(rename = "p97.5"))]
    pub p97_5: f64,
}

/// Result of a bootstrap run, rows sorted by median descending.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapTable {
    pub rows: Vec<BootstrapRow>,
    /// Number of resamples that were actually aggregated.
    pub samples: usize,
}

impl BootstrapTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, model: &str) -> Option<&BootstrapRow> {
        self.rows.iter().find(|r| r.model == model)
    }
}

/// Maps entity names to dense 0..N indices in order of first appearance.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityIndex {
    ids: Vec<EntityId>,
    id_to_idx: HashMap<EntityId, usize>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of `id`, registering it if unseen.
    pub fn get_or_insert(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.id_to_idx.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id.to_string());
        self.id_to_idx.insert(id.to_string(), idx);
        idx
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn to_id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.id_to_idx.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_ordinal_and_outcome() {
        assert_eq!(MatchScore::AWins.value(), 2);
        assert_eq!(MatchScore::Draw.value(), 1);
        assert_eq!(MatchScore::BWins.value(), 0);
        assert_eq!(MatchScore::AWins.outcome(), 1.0);
        assert_eq!(MatchScore::Draw.outcome(), 0.5);
        assert_eq!(MatchScore::BWins.outcome(), 0.0);
    }

    #[test]
    fn test_score_try_from_rejects_out_of_range() {
        assert_eq!(MatchScore::try_from(2).unwrap(), MatchScore::AWins);
        assert!(matches!(MatchScore::try_from(3), Err(RankError::InvalidScore(3))));
    }

    #[test]
    fn test_mirrored_match_keeps_real_outcome() {
        let m = Match::new("x", "y", MatchScore::AWins).with_id("c1");
        let mirror = m.mirrored();
        assert_eq!(mirror.model_a, "y");
        assert_eq!(mirror.model_b, "x");
        assert_eq!(mirror.score, MatchScore::BWins);
        assert_eq!(mirror.id.as_deref(), Some("c1"));
        assert_eq!(mirror.mirrored(), m);
    }

    #[test]
    fn test_category_lookup() {
        let m = Match::new("a", "b", MatchScore::Draw).with_categories(["code", "maths"]);
        assert!(m.has_category("code"));
        assert!(!m.has_category("poetry"));
        assert!(!m.is_self_match());
        assert!(Match::new("a", "a", MatchScore::Draw).is_self_match());
    }

    #[test]
    fn test_score_table_sorts_descending_with_stable_ties() {
        let table = ScoreTable::from_unsorted(vec![
            ScoredEntity { model: "first".into(), score: 1000.0 },
            ScoredEntity { model: "best".into(), score: 1100.0 },
            ScoredEntity { model: "second".into(), score: 1000.0 },
        ]);
        let order: Vec<&str> = table.models().collect();
        assert_eq!(order, vec!["best", "first", "second"]);
        assert_eq!(table.get("second"), Some(1000.0));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn test_entity_index_first_appearance_order() {
        let mut index = EntityIndex::new();
        assert_eq!(index.get_or_insert("b"), 0);
        assert_eq!(index.get_or_insert("a"), 1);
        assert_eq!(index.get_or_insert("b"), 0);
        assert_eq!(index.ids(), &["b".to_string(), "a".to_string()]);
        assert_eq!(index.to_id(1), "a");
        index.clear();
        assert!(index.is_empty());
    }
}
