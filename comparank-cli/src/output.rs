/// Output formatting: terminal table and JSON.
use anyhow::Result;
use comparank_core::{BootstrapTable, CategoryRanking, PairRow, ScoreTable, WinRate};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize)]
struct JsonRankedModel<'a> {
    rank: usize,
    model: &'a str,
    median: f64,
    #[serde(rename = "p2.5")]
    p2_5: f64,
    #[serde(rename = "p97.5")]
    p97_5: f64,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    models: Vec<JsonRankedModel<'a>>,
    samples: usize,
    matches: usize,
}

#[derive(Serialize)]
struct JsonPairs<'a> {
    pairs: &'a [PairRow],
    win_rates: &'a [WinRate],
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(5).max(5) // at least "Model"
}

/// Bootstrap results as a formatted terminal table.
pub fn bootstrap_table(table: &BootstrapTable, matches: usize) -> String {
    let name_width = name_width(table.rows.iter().map(|r| r.model.as_str()));
    let mut out = String::new();

    // Header
    let _ = writeln!(out, " # | {:<name_width$} |    Median | 95% CI Low | 95% CI High", "Model");
    let _ = writeln!(out, "---|-{}-|-----------|------------|------------", "-".repeat(name_width));

    // Rows
    for (i, r) in table.rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2} | {:<name_width$} | {:>9.2} | {:>10.2} | {:>11.2}",
            i + 1,
            r.model,
            r.median,
            r.p2_5,
            r.p97_5,
        );
    }

    let _ = write!(
        out,
        "\n{} models ranked from {} matches ({} bootstrap samples)",
        table.len(),
        matches,
        table.samples,
    );
    out
}

/// Raw scores as a formatted terminal table.
pub fn score_table(scores: &ScoreTable) -> String {
    let name_width = name_width(scores.models());
    let mut out = String::new();

    let _ = writeln!(out, " # | {:<name_width$} |     Score", "Model");
    let _ = writeln!(out, "---|-{}-|----------", "-".repeat(name_width));
    for (i, e) in scores.iter().enumerate() {
        let _ = writeln!(out, "{:>2} | {:<name_width$} | {:>9.2}", i + 1, e.model, e.score);
    }
    let _ = write!(out, "\n{} models scored", scores.len());
    out
}

/// Per-category results, one table per category.
pub fn category_tables(rankings: &[CategoryRanking]) -> String {
    if rankings.is_empty() {
        return "No category has enough matches".to_string();
    }
    rankings
        .iter()
        .map(|r| format!("== {} ==\n{}", r.category, bootstrap_table(&r.table, r.matches)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn ranked_models(table: &BootstrapTable) -> Vec<JsonRankedModel<'_>> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| JsonRankedModel {
            rank: i + 1,
            model: &r.model,
            median: r.median,
            p2_5: r.p2_5,
            p97_5: r.p97_5,
        })
        .collect()
}

pub fn bootstrap_json(table: &BootstrapTable, category: Option<&str>, matches: usize) -> Result<String> {
    let output = JsonOutput {
        category,
        models: ranked_models(table),
        samples: table.samples,
        matches,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

pub fn category_json(rankings: &[CategoryRanking]) -> Result<String> {
    let outputs: Vec<JsonOutput<'_>> = rankings
        .iter()
        .map(|r| JsonOutput {
            category: Some(&r.category),
            models: ranked_models(&r.table),
            samples: r.table.samples,
            matches: r.matches,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&outputs)?)
}

pub fn score_json(scores: &ScoreTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(scores)?)
}

pub fn pairs_json(pairs: &[PairRow], win_rates: &[WinRate]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonPairs { pairs, win_rates })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comparank_core::{BootstrapRow, ScoredEntity};

    fn table() -> BootstrapTable {
        BootstrapTable {
            rows: vec![
                BootstrapRow { model: "gpt".into(), median: 1050.0, p2_5: 1010.0, p97_5: 1090.0 },
                BootstrapRow { model: "mistral".into(), median: 950.0, p2_5: 900.0, p97_5: 990.0 },
            ],
            samples: 100,
        }
    }

    #[test]
    fn test_bootstrap_table_layout() {
        let text = bootstrap_table(&table(), 42);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("Model  "));
        assert!(lines[2].starts_with(" 1 | gpt    "));
        assert!(lines[2].contains("1050.00"));
        assert!(lines[3].contains("mistral"));
        assert!(text.ends_with("2 models ranked from 42 matches (100 bootstrap samples)"));
    }

    #[test]
    fn test_bootstrap_json_uses_percentile_keys() {
        let json = bootstrap_json(&table(), Some("code"), 42).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["category"], "code");
        assert_eq!(value["models"][0]["model"], "gpt");
        assert_eq!(value["models"][0]["p2.5"], 1010.0);
        assert_eq!(value["models"][1]["rank"], 2);
        assert_eq!(value["samples"], 100);

        let json = bootstrap_json(&table(), None, 42).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("category").is_none());
    }

    #[test]
    fn test_score_outputs() {
        let scores = ScoreTable::from_unsorted(vec![
            ScoredEntity { model: "a".into(), score: 990.0 },
            ScoredEntity { model: "b".into(), score: 1010.0 },
        ]);
        let text = score_table(&scores);
        assert!(text.lines().nth(2).unwrap().contains("b"));

        let value: serde_json::Value = serde_json::from_str(&score_json(&scores).unwrap()).unwrap();
        assert_eq!(value[0]["model"], "b");
        assert_eq!(value[1]["score"], 990.0);
    }

    #[test]
    fn test_empty_category_list() {
        assert_eq!(category_tables(&[]), "No category has enough matches");
        assert_eq!(category_json(&[]).unwrap(), "[]");
    }
}
