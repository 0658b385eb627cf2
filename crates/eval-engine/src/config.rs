//! Configuration for evaluation requests

use eval_core::{Error, Result, SourcePriority};
use eval_utils::env_parse;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relative weight of each sub-score in the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub financial: f64,
    pub founder: f64,
    pub risk: f64,
    pub valuation: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            financial: 0.35,
            founder: 0.25,
            risk: 0.25,
            valuation: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("financial", self.financial),
            ("founder", self.founder),
            ("risk", self.risk),
            ("valuation", self.valuation),
        ];
        for (name, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "weight '{name}' must be a finite, non-negative number (got {weight})"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(Error::Config("at least one weight must be positive".to_string()));
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.financial + self.founder + self.risk + self.valuation
    }
}

/// Configuration for the evaluation engine
///
/// Durations are stored in milliseconds so that configuration files stay
/// readable; use the accessors to get [`Duration`] values.
///
/// # Example
///
/// ```json
/// {
///   "per_agent_timeout_ms": 15000,
///   "request_deadline_ms": 40000,
///   "weights": { "financial": 0.4, "founder": 0.3, "risk": 0.2, "valuation": 0.1 },
///   "source_priority": ["financial", "document", "profile", "news", "web_search"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Upper bound on a single agent's run
    pub per_agent_timeout_ms: u64,

    /// Upper bound on a whole evaluation request
    pub request_deadline_ms: u64,

    /// Share of the request budget given to the dispatch stage
    pub dispatch_budget_share: f64,

    /// Sub-score weights used by the aggregator
    pub weights: ScoreWeights,

    /// Ranking used to break confidence ties between sources
    pub source_priority: SourcePriority,

    /// Relative tolerance under which two numbers agree
    pub numeric_tolerance: f64,

    /// Aggregate confidence below which no verdict is given
    pub min_recommendation_confidence: f64,

    /// Maximum length of a scorer's rationale
    pub rationale_max_chars: usize,

    /// Re-dispatch agents that lacked input once the record supplies it
    pub follow_up_discovery: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            per_agent_timeout_ms: 20_000,   // 20 seconds
            request_deadline_ms: 45_000,    // 45 seconds
            dispatch_budget_share: 0.85,
            weights: ScoreWeights::default(),
            source_priority: SourcePriority::default(),
            numeric_tolerance: 0.01,        // 1%
            min_recommendation_confidence: 0.30,
            rationale_max_chars: 600,
            follow_up_discovery: true,
        }
    }
}

impl EvalConfig {
    /// Create a new configuration builder
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }

    pub fn per_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.per_agent_timeout_ms)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    /// Portion of the request budget the dispatch stage may use
    pub fn dispatch_budget(&self) -> Duration {
        self.request_deadline().mul_f64(self.dispatch_budget_share)
    }

    /// Load a configuration file, filling unspecified values with defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config: EvalConfig = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `STARTUP_EVAL_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let config_err = |e: eval_utils::EnvError| Error::Config(e.to_string());

        if let Some(ms) = env_parse("STARTUP_EVAL_PER_AGENT_TIMEOUT_MS").map_err(config_err)? {
            self.per_agent_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("STARTUP_EVAL_REQUEST_DEADLINE_MS").map_err(config_err)? {
            self.request_deadline_ms = ms;
        }
        if let Some(share) = env_parse("STARTUP_EVAL_DISPATCH_BUDGET_SHARE").map_err(config_err)? {
            self.dispatch_budget_share = share;
        }
        if let Some(tolerance) = env_parse("STARTUP_EVAL_NUMERIC_TOLERANCE").map_err(config_err)? {
            self.numeric_tolerance = tolerance;
        }
        if let Some(min) = env_parse("STARTUP_EVAL_MIN_CONFIDENCE").map_err(config_err)? {
            self.min_recommendation_confidence = min;
        }
        if let Some(enabled) = env_parse("STARTUP_EVAL_FOLLOW_UP").map_err(config_err)? {
            self.follow_up_discovery = enabled;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.per_agent_timeout_ms == 0 {
            return Err(Error::Config(
                "per_agent_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.request_deadline_ms == 0 {
            return Err(Error::Config(
                "request_deadline_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.dispatch_budget_share > 0.0 && self.dispatch_budget_share <= 1.0) {
            return Err(Error::Config(format!(
                "dispatch_budget_share must be in (0, 1], got {}",
                self.dispatch_budget_share
            )));
        }

        if !(0.0..1.0).contains(&self.numeric_tolerance) {
            return Err(Error::Config(format!(
                "numeric_tolerance must be in [0, 1), got {}",
                self.numeric_tolerance
            )));
        }

        if !(0.0..=1.0).contains(&self.min_recommendation_confidence) {
            return Err(Error::Config(format!(
                "min_recommendation_confidence must be in [0, 1], got {}",
                self.min_recommendation_confidence
            )));
        }

        if self.rationale_max_chars < 40 {
            return Err(Error::Config(
                "rationale_max_chars must be at least 40".to_string(),
            ));
        }

        self.weights.validate()
    }
}

/// Builder for EvalConfig
#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    per_agent_timeout: Option<Duration>,
    request_deadline: Option<Duration>,
    dispatch_budget_share: Option<f64>,
    weights: Option<ScoreWeights>,
    source_priority: Option<SourcePriority>,
    numeric_tolerance: Option<f64>,
    min_recommendation_confidence: Option<f64>,
    rationale_max_chars: Option<usize>,
    follow_up_discovery: Option<bool>,
}

impl EvalConfigBuilder {
    /// Set the per-agent timeout
    pub fn per_agent_timeout(mut self, duration: Duration) -> Self {
        self.per_agent_timeout = Some(duration);
        self
    }

    /// Set the overall request deadline
    pub fn request_deadline(mut self, duration: Duration) -> Self {
        self.request_deadline = Some(duration);
        self
    }

    pub fn dispatch_budget_share(mut self, share: f64) -> Self {
        self.dispatch_budget_share = Some(share);
        self
    }

    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn source_priority(mut self, priority: SourcePriority) -> Self {
        self.source_priority = Some(priority);
        self
    }

    pub fn numeric_tolerance(mut self, tolerance: f64) -> Self {
        self.numeric_tolerance = Some(tolerance);
        self
    }

    pub fn min_recommendation_confidence(mut self, confidence: f64) -> Self {
        self.min_recommendation_confidence = Some(confidence);
        self
    }

    pub fn rationale_max_chars(mut self, chars: usize) -> Self {
        self.rationale_max_chars = Some(chars);
        self
    }

    pub fn follow_up_discovery(mut self, enabled: bool) -> Self {
        self.follow_up_discovery = Some(enabled);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EvalConfig> {
        let defaults = EvalConfig::default();

        let config = EvalConfig {
            per_agent_timeout_ms: self
                .per_agent_timeout
                .map_or(defaults.per_agent_timeout_ms, duration_ms),
            request_deadline_ms: self
                .request_deadline
                .map_or(defaults.request_deadline_ms, duration_ms),
            dispatch_budget_share: self
                .dispatch_budget_share
                .unwrap_or(defaults.dispatch_budget_share),
            weights: self.weights.unwrap_or(defaults.weights),
            source_priority: self.source_priority.unwrap_or(defaults.source_priority),
            numeric_tolerance: self.numeric_tolerance.unwrap_or(defaults.numeric_tolerance),
            min_recommendation_confidence: self
                .min_recommendation_confidence
                .unwrap_or(defaults.min_recommendation_confidence),
            rationale_max_chars: self
                .rationale_max_chars
                .unwrap_or(defaults.rationale_max_chars),
            follow_up_discovery: self
                .follow_up_discovery
                .unwrap_or(defaults.follow_up_discovery),
        };

        config.validate()?;
        Ok(config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
