/// Config file loading and creation for the comparank CLI.
///
/// Config lives at ~/.config/comparank/config.toml.
/// All fields are optional; CLI args override config values.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ComparankConfig {
    pub method: Option<String>,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
    pub parallel: Option<bool>,
    /// Wall-clock budget for the bootstrap, in seconds.
    pub deadline_secs: Option<u64>,
    pub scale: Option<f64>,
    pub default_score: Option<f64>,
    pub k_factor: Option<f64>,
    pub max_iter: Option<usize>,
    pub include_votes: Option<bool>,
    pub include_reactions: Option<bool>,
    pub categories: Option<Vec<String>>,
    pub min_category_matches: Option<usize>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# comparank configuration
# All values here can be overridden by CLI flags.

# Ranking method: \"elo\" or \"ml\" (maximum likelihood)
# method = \"elo\"

# Bootstrap resamples and seed (omit seed for a random one)
# samples = 100
# seed = 42

# Run bootstrap resamples on all cores
# parallel = false

# Stop starting new resamples after this many seconds
# deadline_secs = 60

# Rating scale and starting score
# scale = 400.0
# default_score = 1000.0

# ELO K-factor
# k_factor = 40.0

# Maximum-likelihood solver iteration cap
# max_iter = 200

# Which match sources to use
# include_votes = true
# include_reactions = false

# Known categories (default: every tag found in the data)
# categories = [\"code\", \"maths\"]

# Categories with fewer matches are skipped by --all-categories
# min_category_matches = 5000
";

/// Returns the default config path: ~/.config/comparank/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("comparank").join("config.toml"))
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> Result<ComparankConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ComparankConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read config at {}", path.display())),
    }
}

/// Create the default config file at `path`. Errors if it already exists.
pub fn create_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}
