use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{
    ArrivalSource, DensityCheck, Distribution, GeneratorConfig, ServiceSource, SimConfig,
    DEFAULT_BUFFER_CAPACITY, DEFAULT_TIE_EPSILON,
};

#[derive(Parser, Debug)]
#[command(name = "queue-sim", args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[command(flatten)]
    pub run: RunArgs,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation (the default when no subcommand is given)
    Run(RunArgs),
    /// Print the resolved configuration without running it
    ShowConfig(RunArgs),
    /// List supported distribution kinds
    ListDistributions,
    /// Sample a distribution and compare its histogram with the density
    CheckDistribution(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(help = "Distribution to sample, e.g. normal:0:1 or weibull:2:1.5")]
    pub distribution: String,
    #[arg(long, default_value_t = 10_000)]
    pub samples: usize,
    #[arg(long, default_value_t = 20)]
    pub bins: usize,
    #[arg(long, allow_negative_numbers = true, help = "Histogram lower bound")]
    pub lower: Option<f64>,
    #[arg(long, allow_negative_numbers = true, help = "Histogram upper bound")]
    pub upper: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, help = "seeded or congruential:A:B:M:X0")]
    pub generator: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(long, help = "TOML or JSON configuration file")]
    pub config: Option<PathBuf>,
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub arrival_times: Vec<f64>,
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub service_times: Vec<f64>,
    #[arg(long, help = "Inter-arrival distribution, e.g. uniform:4:12 or exponential:0.33")]
    pub interarrival: Option<String>,
    #[arg(long, help = "Service-time distribution, e.g. fixed:5 or weibull:2:1.5")]
    pub service: Option<String>,
    #[arg(long)]
    pub jobs: Option<usize>,
    #[arg(long, allow_negative_numbers = true)]
    pub buffer: Option<i64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, help = "seeded or congruential:A:B:M:X0")]
    pub generator: Option<String>,
    #[arg(long)]
    pub detailed: bool,
    #[arg(long, allow_negative_numbers = true)]
    pub tie_epsilon: Option<f64>,
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    #[arg(long, help = "Shorthand for --format summary")]
    pub summary: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FormatArg {
    #[default]
    Human,
    Summary,
    Json,
}

pub fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => Err(Error::Cli(err.to_string())),
    }
}

pub fn load_config(path: &Path) -> Result<SimConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// Resolves flags (and an optional config file) into a simulation config.
/// Flags given next to `--config` override the file.
pub fn build_config(args: RunArgs) -> Result<(SimConfig, FormatArg)> {
    let format = if args.summary {
        FormatArg::Summary
    } else {
        args.format.unwrap_or_default()
    };

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig {
            arrivals: arrival_source(&args)?,
            service: service_source(&args)?,
            jobs: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            generator: GeneratorConfig::Seeded,
            seed: None,
            detailed: false,
            tie_epsilon: DEFAULT_TIE_EPSILON,
        },
    };

    if args.config.is_some() {
        if !args.arrival_times.is_empty() || args.interarrival.is_some() {
            config.arrivals = arrival_source(&args)?;
        }
        if !args.service_times.is_empty() || args.service.is_some() {
            config.service = service_source(&args)?;
        }
    }
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    if let Some(buffer) = args.buffer {
        config.buffer_capacity = buffer;
    }
    if let Some(spec) = &args.generator {
        config.generator = parse_generator(spec)?;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.detailed {
        config.detailed = true;
    }
    if let Some(epsilon) = args.tie_epsilon {
        config.tie_epsilon = epsilon;
    }

    Ok((config, format))
}

pub fn build_check(args: CheckArgs) -> Result<DensityCheck> {
    let generator = match &args.generator {
        Some(spec) => parse_generator(spec)?,
        None => GeneratorConfig::Seeded,
    };
    Ok(DensityCheck {
        distribution: parse_distribution(&args.distribution)?,
        samples: args.samples,
        bins: args.bins,
        lower: args.lower,
        upper: args.upper,
        generator,
        seed: args.seed,
    })
}

fn arrival_source(args: &RunArgs) -> Result<ArrivalSource> {
    if !args.arrival_times.is_empty() {
        return Ok(ArrivalSource::Times(args.arrival_times.clone()));
    }
    match &args.interarrival {
        Some(spec) => Ok(ArrivalSource::Interarrival(parse_distribution(spec)?)),
        None => Err(Error::MissingArrivals),
    }
}

fn service_source(args: &RunArgs) -> Result<ServiceSource> {
    if !args.service_times.is_empty() {
        return Ok(ServiceSource::Durations(args.service_times.clone()));
    }
    match &args.service {
        Some(spec) => Ok(ServiceSource::Sampled(parse_distribution(spec)?)),
        None => Err(Error::MissingService),
    }
}

pub fn parse_distribution(input: &str) -> Result<Distribution> {
    let trimmed = input.trim();
    let invalid = || Error::InvalidDistributionSpec(trimmed.to_string());

    let mut parts = trimmed.split(':').map(str::trim);
    let kind = parts.next().unwrap_or("");
    let params = parts
        .map(|value| value.parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<f64>>>()?;

    let distribution = match (kind, params.as_slice()) {
        ("fixed", [value]) => Distribution::Fixed { value: *value },
        ("uniform", [min, max]) => Distribution::Uniform {
            min: *min,
            max: *max,
        },
        ("exponential", [rate]) => Distribution::Exponential { rate: *rate },
        ("weibull", [scale, shape]) => Distribution::Weibull {
            scale: *scale,
            shape: *shape,
        },
        ("normal", [mean, sigma]) => Distribution::Normal {
            mean: *mean,
            sigma: *sigma,
        },
        _ => return Err(invalid()),
    };
    distribution.validate()?;
    Ok(distribution)
}

pub fn parse_generator(input: &str) -> Result<GeneratorConfig> {
    let trimmed = input.trim();
    if trimmed == "seeded" {
        return Ok(GeneratorConfig::Seeded);
    }

    let invalid = || Error::InvalidGeneratorSpec(trimmed.to_string());
    let mut parts = trimmed.split(':').map(str::trim);
    if parts.next() != Some("congruential") {
        return Err(invalid());
    }
    let values = parts
        .map(|value| value.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<u64>>>()?;
    match values.as_slice() {
        [multiplier, increment, modulus, seed] => Ok(GeneratorConfig::Congruential {
            multiplier: *multiplier,
            increment: *increment,
            modulus: *modulus,
            seed: *seed,
        }),
        _ => Err(invalid()),
    }
}
