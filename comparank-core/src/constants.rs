/// Logistic steepness divisor shared by both rankers: a rating gap of `scale`
/// points means 10:1 odds.
pub const DEFAULT_SCALE: f64 = 400.0;

/// Rating given to an entity on first appearance, and the offset added to
/// maximum-likelihood coefficients so both rankers share units.
pub const DEFAULT_SCORE: f64 = 1000.0;

/// Base of the logistic link. Matches the ELO convention so the two rankers
/// produce comparable numbers.
pub const LOGISTIC_BASE: f64 = 10.0;

/// Base K-factor of the ELO update.
pub const DEFAULT_K_FACTOR: f64 = 40.0;

/// Above this rating the K-factor is divided by 4.
pub const HIGH_RATING_THRESHOLD: f64 = 2400.0;

/// When both entities have played more than this many matches, the K-factor
/// is halved.
pub const ESTABLISHED_MATCH_COUNT: usize = 30;

/// Iteration cap of the logistic regression solver.
pub const DEFAULT_MAX_ITER: usize = 200;

/// Max-abs gradient of the mean log-loss at which the solver stops.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Relative diagonal jitter added to the Hessian before solving. Keeps the
/// per-component shift direction solvable without penalizing the fit.
pub const HESSIAN_JITTER: f64 = 1e-10;

/// Backtracking halvings tried before a Newton step is abandoned.
pub const MAX_LINE_SEARCH_STEPS: usize = 30;

/// Default number of bootstrap resamples.
pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 100;

/// Quantiles reported by the bootstrap (95% interval).
pub const LOWER_QUANTILE: f64 = 0.025;
pub const UPPER_QUANTILE: f64 = 0.975;

/// Categories with fewer matches are skipped by `run_all_categories`.
pub const DEFAULT_MIN_CATEGORY_MATCHES: usize = 5000;
