/// Match file loading: JSON Lines or CSV, picked by extension.
use anyhow::{Context, Result};
use comparank_core::{Match, MatchScore};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CSV row. Categories are `|`-separated in a single column.
#[derive(Deserialize)]
struct CsvRow {
    model_a: String,
    model_b: String,
    score: u8,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    categories: Option<String>,
}

impl CsvRow {
    fn into_match(self) -> Result<Match> {
        let score = MatchScore::try_from(self.score)?;
        let categories: Vec<String> = self
            .categories
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();

        let mut m = Match::new(self.model_a, self.model_b, score).with_categories(categories);
        m.id = self.id.filter(|id| !id.is_empty());
        Ok(m)
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

pub fn parse_csv(content: &str) -> Result<Vec<Match>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(content.as_bytes());
    let mut matches = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let row = row.with_context(|| format!("Invalid CSV row at line {}", i + 2))?;
        matches.push(row.into_match().with_context(|| format!("Invalid match at line {}", i + 2))?);
    }
    Ok(matches)
}

/// One JSON object per line; blank lines are skipped.
pub fn parse_jsonl(content: &str) -> Result<Vec<Match>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Match>(line).with_context(|| format!("Invalid match at line {}", i + 1))
        })
        .collect()
}

pub fn load_matches(path: &Path) -> Result<Vec<Match>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read match file {}", path.display()))?;
    let parsed = if is_csv(path) { parse_csv(&content) } else { parse_jsonl(&content) };
    parsed.with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load and concatenate files in the order given.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Match>> {
    let mut matches = Vec::new();
    for path in paths {
        matches.extend(load_matches(path)?);
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_csv_with_optional_columns() {
        let content = "model_a,model_b,score,id,categories\n\
                       x,y,2,c1,code|maths\n\
                       y,z,1,,\n";
        let matches = parse_csv(content).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].score, MatchScore::AWins);
        assert_eq!(matches[0].id.as_deref(), Some("c1"));
        assert_eq!(matches[0].categories, vec!["code", "maths"]);
        assert_eq!(matches[1].score, MatchScore::Draw);
        assert_eq!(matches[1].id, None);
        assert!(matches[1].categories.is_empty());
    }

    #[test]
    fn test_parse_csv_minimal_header() {
        let matches = parse_csv("model_a,model_b,score\nx,y,0\n").unwrap();
        assert_eq!(matches[0].score, MatchScore::BWins);
    }

    #[test]
    fn test_parse_csv_rejects_bad_score() {
        let err = parse_csv("model_a,model_b,score\nx,y,3\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_parse_jsonl() {
        let content = r#"{"model_a":"x","model_b":"y","score":2,"categories":["code"]}

{"model_a":"y","model_b":"x","score":1,"id":"p7"}
"#;
        let matches = parse_jsonl(content).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].has_category("code"));
        assert_eq!(matches[1].id.as_deref(), Some("p7"));
        assert!(parse_jsonl(r#"{"model_a":"x","model_b":"y","score":5}"#).is_err());
    }

    #[test]
    fn test_load_all_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("votes.CSV");
        let jsonl_path = dir.path().join("reactions.jsonl");

        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "model_a,model_b,score\nx,y,2").unwrap();
        let mut f = std::fs::File::create(&jsonl_path).unwrap();
        writeln!(f, r#"{{"model_a":"y","model_b":"z","score":0}}"#).unwrap();

        let matches = load_all(&[csv_path, jsonl_path]).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].model_a, "x");
        assert_eq!(matches[1].model_b, "z");

        assert!(load_matches(&dir.path().join("missing.jsonl")).is_err());
    }
}
