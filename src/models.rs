use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BUFFER_CAPACITY: i64 = 10;
pub const DEFAULT_TIE_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimConfig {
    pub arrivals: ArrivalSource,
    pub service: ServiceSource,
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: i64,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub detailed: bool,
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
}

/// Arrival timestamps, either listed explicitly or built by accumulating
/// sampled inter-arrival times from 0.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ArrivalSource {
    Times(Vec<f64>),
    Interarrival(Distribution),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ServiceSource {
    Durations(Vec<f64>),
    Sampled(Distribution),
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Distribution {
    Fixed { value: f64 },
    Uniform { min: f64, max: f64 },
    Exponential { rate: f64 },
    Weibull { scale: f64, shape: f64 },
    Normal { mean: f64, sigma: f64 },
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GeneratorConfig {
    #[default]
    Seeded,
    Congruential {
        multiplier: u64,
        increment: u64,
        modulus: u64,
        seed: u64,
    },
}

/// Request to sample a distribution and compare the histogram of the
/// samples with its density. Missing range bounds fall back to
/// [`Distribution::density_range`].
#[derive(Clone, Debug, PartialEq)]
pub struct DensityCheck {
    pub distribution: Distribution,
    pub samples: usize,
    pub bins: usize,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub generator: GeneratorConfig,
    pub seed: Option<u64>,
}

/// Validated input of a single simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationInput {
    pub arrivals: Vec<f64>,
    pub services: Vec<f64>,
    pub buffer_capacity: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimOptions {
    /// Keep per-job waiting times and job records.
    pub detailed: bool,
    /// Two event times closer than this are treated as simultaneous.
    pub tie_epsilon: f64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            detailed: false,
            tie_epsilon: DEFAULT_TIE_EPSILON,
        }
    }
}

impl SimOptions {
    pub fn detailed() -> Self {
        Self {
            detailed: true,
            ..Self::default()
        }
    }
}

impl Distribution {
    pub const NAMES: [&'static str; 5] = ["fixed", "uniform", "exponential", "weibull", "normal"];
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Fixed { value } => write!(f, "fixed({})", value),
            Distribution::Uniform { min, max } => write!(f, "uniform({}, {})", min, max),
            Distribution::Exponential { rate } => write!(f, "exponential(rate={})", rate),
            Distribution::Weibull { scale, shape } => {
                write!(f, "weibull(scale={}, shape={})", scale, shape)
            }
            Distribution::Normal { mean, sigma } => {
                write!(f, "normal(mean={}, sigma={})", mean, sigma)
            }
        }
    }
}

impl GeneratorConfig {
    pub fn is_congruential(&self) -> bool {
        matches!(self, GeneratorConfig::Congruential { .. })
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorConfig::Seeded => write!(f, "seeded"),
            GeneratorConfig::Congruential {
                multiplier,
                increment,
                modulus,
                seed,
            } => write!(
                f,
                "congruential(a={}, b={}, m={}, x0={})",
                multiplier, increment, modulus, seed
            ),
        }
    }
}

fn default_buffer_capacity() -> i64 {
    DEFAULT_BUFFER_CAPACITY
}

fn default_tie_epsilon() -> f64 {
    DEFAULT_TIE_EPSILON
}
