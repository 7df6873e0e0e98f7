use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("arrival times must be strictly increasing (job {index}: {current} after {previous})")]
    NonIncreasingArrival {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("arrival time must be >= 0 (job {index}: {value})")]
    NegativeArrival { index: usize, value: f64 },
    #[error("arrival time must be finite (job {index}: {value})")]
    NonFiniteArrival { index: usize, value: f64 },
    #[error("service duration must be finite and >= 0 (entry {index}: {value})")]
    InvalidServiceDuration { index: usize, value: f64 },
    #[error("buffer capacity must be >= 0 (got {0})")]
    NegativeBufferCapacity(i64),
    #[error("service durations supplied without any arrivals")]
    ServicesWithoutArrivals,
    #[error("tie epsilon must be finite and >= 0 (got {0})")]
    InvalidTieEpsilon(f64),
    #[error("service pool exhausted: job {job} needs service but only {available} durations were supplied")]
    ServicePoolExhausted { job: usize, available: usize },
    #[error("invalid distribution '{0}': expected fixed:V, uniform:MIN:MAX, exponential:RATE, weibull:SCALE:SHAPE or normal:MEAN:SIGMA")]
    InvalidDistributionSpec(String),
    #[error("invalid distribution parameters: {0}")]
    InvalidDistribution(String),
    #[error("{0} has no density to compare samples against")]
    NoDensity(String),
    #[error("invalid histogram range: {0}")]
    InvalidFitRange(String),
    #[error("invalid generator '{0}': expected seeded or congruential:A:B:M:X0")]
    InvalidGeneratorSpec(String),
    #[error("invalid generator parameters: {0}")]
    InvalidGenerator(String),
    #[error("jobs must be set when {0} are generated from a distribution")]
    JobsRequired(&'static str),
    #[error("jobs must be greater than 0")]
    JobsZero,
    #[error("samples must be greater than 0")]
    SamplesZero,
    #[error("arrivals must be given as --arrival-times or --interarrival")]
    MissingArrivals,
    #[error("service must be given as --service-times or --service")]
    MissingService,
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
