mod config;
mod input;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use comparank_core::{
    win_rates, BootstrapConfig, PairwiseAggregate, PipelineConfig, RankerConfig, RankingMethod,
    RankingPipeline,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ComparankConfig;

#[derive(Parser)]
#[command(name = "comparank", version, about = "Rank models from pairwise comparisons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Bootstrap ratings with 95% confidence intervals
    Rank(RankArgs),
    /// Single-pass ratings, no bootstrap
    Scores(RankArgs),
    /// Pairwise match counts and win rates (JSON)
    Pairs(RankArgs),
    /// Create a default config file at ~/.config/comparank/config.toml
    Init,
}

#[derive(Parser)]
struct RankArgs {
    /// Vote file (.csv or JSON Lines), repeatable
    #[arg(long = "matches")]
    matches: Vec<PathBuf>,

    /// Reaction file (.csv or JSON Lines), repeatable
    #[arg(long = "reactions")]
    reactions: Vec<PathBuf>,

    /// Ranking method: "elo" or "ml"
    #[arg(long)]
    method: Option<String>,

    /// Number of bootstrap resamples
    #[arg(long)]
    samples: Option<usize>,

    /// Seed for reproducible resampling
    #[arg(long)]
    seed: Option<u64>,

    /// Run bootstrap resamples in parallel
    #[arg(long)]
    parallel: bool,

    /// Only use matches tagged with this category
    #[arg(long, conflicts_with = "all_categories")]
    category: Option<String>,

    /// Rank every category with enough matches
    #[arg(long)]
    all_categories: bool,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file (default: ~/.config/comparank/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Merge config file and CLI args (CLI wins) into a pipeline config.
fn pipeline_config(args: &RankArgs, cfg: ComparankConfig) -> Result<PipelineConfig> {
    let defaults = PipelineConfig::default();

    let method = match args.method.as_deref().or(cfg.method.as_deref()) {
        Some(name) => name.parse::<RankingMethod>()?,
        None => defaults.method,
    };

    let bootstrap = BootstrapConfig {
        samples: args.samples.or(cfg.samples).unwrap_or(defaults.bootstrap.samples),
        seed: args.seed.or(cfg.seed),
        parallel: args.parallel || cfg.parallel.unwrap_or(false),
        deadline: cfg.deadline_secs.map(Duration::from_secs),
    };

    // Files given on the command line are used even if the config leaves
    // their source off.
    let include_votes = !args.matches.is_empty() || cfg.include_votes.unwrap_or(defaults.include_votes);
    let include_reactions = !args.reactions.is_empty() || cfg.include_reactions.unwrap_or(defaults.include_reactions);

    Ok(PipelineConfig {
        method,
        include_votes,
        include_reactions,
        ranker: RankerConfig {
            scale: cfg.scale.unwrap_or(defaults.ranker.scale),
            default_score: cfg.default_score.unwrap_or(defaults.ranker.default_score),
        },
        k_factor: cfg.k_factor.unwrap_or(defaults.k_factor),
        max_iter: cfg.max_iter.unwrap_or(defaults.max_iter),
        bootstrap,
        categories: cfg.categories,
        min_category_matches: cfg.min_category_matches.unwrap_or(defaults.min_category_matches),
    })
}

fn build_pipeline(args: &RankArgs) -> Result<RankingPipeline> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    let cfg = config::load_config(&config_path)?;
    let pipeline_config = pipeline_config(args, cfg)?;

    if args.matches.is_empty() && args.reactions.is_empty() {
        bail!("No match files provided. Use --matches <file> and/or --reactions <file>.");
    }
    let votes = input::load_all(&args.matches)?;
    let reactions = input::load_all(&args.reactions)?;
    info!(votes = votes.len(), reactions = reactions.len(), "loaded matches");

    Ok(RankingPipeline::new(pipeline_config, votes, reactions)?)
}

fn run_rank(args: &RankArgs) -> Result<String> {
    let pipeline = build_pipeline(args)?;

    if args.all_categories {
        let rankings = pipeline.run_all_categories()?;
        return if args.json {
            output::category_json(&rankings)
        } else {
            Ok(output::category_tables(&rankings))
        };
    }

    let category = args.category.as_deref();
    let matches = pipeline.match_list(category)?;
    let table = pipeline.run_matches(&matches)?;

    if args.json {
        output::bootstrap_json(&table, category, matches.len())
    } else {
        Ok(output::bootstrap_table(&table, matches.len()))
    }
}

fn run_scores(args: &RankArgs) -> Result<String> {
    let pipeline = build_pipeline(args)?;
    let scores = pipeline.scores(args.category.as_deref())?;
    if args.json {
        output::score_json(&scores)
    } else {
        Ok(output::score_table(&scores))
    }
}

fn run_pairs(args: &RankArgs) -> Result<String> {
    let pipeline = build_pipeline(args)?;
    let matches = pipeline.match_list(args.category.as_deref())?;
    let pairs = PairwiseAggregate::from_matches(&matches);
    output::pairs_json(&pairs.rows(), &win_rates(&matches))
}

fn run_init() -> Result<String> {
    let path = config::config_path()?;
    config::create_default_config(&path)?;
    Ok(format!(
        "Created config at {}\nEdit it to set your default method, samples, etc.",
        path.display()
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let text = match &cli.command {
        Commands::Rank(args) => {
            init_tracing(args.verbose);
            run_rank(args).context("rank failed")?
        }
        Commands::Scores(args) => {
            init_tracing(args.verbose);
            run_scores(args).context("scoring failed")?
        }
        Commands::Pairs(args) => {
            init_tracing(args.verbose);
            run_pairs(args).context("pairwise statistics failed")?
        }
        Commands::Init => run_init()?,
    };

    println!("{text}");
    Ok(())
}
