use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::analysis::DensityFit;
use crate::error::{Error, Result};
use crate::models::{
    ArrivalSource, DensityCheck, Distribution, GeneratorConfig, ServiceSource, SimConfig,
    SimulationInput,
};
use crate::sources::{CongruentialRng, SeededSource, UnitSource, PERIOD_SEARCH_LIMIT};

impl Distribution {
    pub fn validate(&self) -> Result<()> {
        let params_finite = match *self {
            Distribution::Fixed { value } => value.is_finite(),
            Distribution::Uniform { min, max } => min.is_finite() && max.is_finite(),
            Distribution::Exponential { rate } => rate.is_finite(),
            Distribution::Weibull { scale, shape } => scale.is_finite() && shape.is_finite(),
            Distribution::Normal { mean, sigma } => mean.is_finite() && sigma.is_finite(),
        };
        if !params_finite {
            return Err(Error::InvalidDistribution(format!(
                "{}: parameters must be finite",
                self
            )));
        }

        match *self {
            Distribution::Fixed { value } if value < 0.0 => Err(Error::InvalidDistribution(
                format!("{}: value must be >= 0", self),
            )),
            Distribution::Uniform { min, max } if min < 0.0 || min > max => Err(
                Error::InvalidDistribution(format!("{}: expected 0 <= min <= max", self)),
            ),
            Distribution::Exponential { rate } if rate <= 0.0 => Err(Error::InvalidDistribution(
                format!("{}: rate must be > 0", self),
            )),
            Distribution::Weibull { scale, shape } if scale <= 0.0 || shape <= 0.0 => Err(
                Error::InvalidDistribution(format!("{}: scale and shape must be > 0", self)),
            ),
            Distribution::Normal { sigma, .. } if sigma <= 0.0 => Err(Error::InvalidDistribution(
                format!("{}: sigma must be > 0", self),
            )),
            _ => Ok(()),
        }
    }

    /// Inverse-transform sample driven by `source`. Each call draws one
    /// unit variate.
    pub fn sample(&self, source: &mut dyn UnitSource) -> f64 {
        match *self {
            Distribution::Fixed { value } => value,
            Distribution::Uniform { min, max } => min + (max - min) * source.next_unit(),
            Distribution::Exponential { rate } => -positive_unit(source).ln() / rate,
            Distribution::Weibull { scale, shape } => {
                scale * (-positive_unit(source).ln()).powf(1.0 / shape)
            }
            Distribution::Normal { mean, sigma } => {
                mean + sigma * standard_normal_quantile(positive_unit(source))
            }
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Fixed { value } => value,
            Distribution::Uniform { min, max } => (min + max) / 2.0,
            Distribution::Exponential { rate } => 1.0 / rate,
            Distribution::Weibull { scale, shape } => scale * gamma(1.0 + 1.0 / shape),
            Distribution::Normal { mean, .. } => mean,
        }
    }

    pub fn variance(&self) -> f64 {
        match *self {
            Distribution::Fixed { .. } => 0.0,
            Distribution::Uniform { min, max } => (max - min) * (max - min) / 12.0,
            Distribution::Exponential { rate } => 1.0 / (rate * rate),
            Distribution::Weibull { scale, shape } => {
                let first = gamma(1.0 + 1.0 / shape);
                scale * scale * (gamma(1.0 + 2.0 / shape) - first * first)
            }
            Distribution::Normal { sigma, .. } => sigma * sigma,
        }
    }

    /// Probability density at `x`; `None` for point masses.
    pub fn pdf(&self, x: f64) -> Option<f64> {
        let density = match *self {
            Distribution::Fixed { .. } => return None,
            Distribution::Uniform { min, max } if max <= min => return None,
            Distribution::Uniform { min, max } => {
                if (min..=max).contains(&x) {
                    1.0 / (max - min)
                } else {
                    0.0
                }
            }
            Distribution::Exponential { rate } => {
                if x < 0.0 {
                    0.0
                } else {
                    rate * (-rate * x).exp()
                }
            }
            Distribution::Weibull { scale, shape } => {
                if x < 0.0 {
                    0.0
                } else if x == 0.0 {
                    match shape.partial_cmp(&1.0) {
                        Some(std::cmp::Ordering::Less) => f64::INFINITY,
                        Some(std::cmp::Ordering::Equal) => 1.0 / scale,
                        _ => 0.0,
                    }
                } else {
                    let ratio = x / scale;
                    shape / scale * ratio.powf(shape - 1.0) * (-ratio.powf(shape)).exp()
                }
            }
            Distribution::Normal { mean, sigma } => {
                let z = (x - mean) / sigma;
                (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
            }
        };
        Some(density)
    }

    /// Interval holding all but about 0.1% of the mass, used as the default
    /// histogram range when checking samples against the density.
    pub fn density_range(&self) -> Option<(f64, f64)> {
        const TAIL: f64 = 1e-3;
        match *self {
            Distribution::Fixed { .. } => None,
            Distribution::Uniform { min, max } if max <= min => None,
            Distribution::Uniform { min, max } => Some((min, max)),
            Distribution::Exponential { rate } => Some((0.0, -TAIL.ln() / rate)),
            Distribution::Weibull { scale, shape } => {
                Some((0.0, scale * (-TAIL.ln()).powf(1.0 / shape)))
            }
            Distribution::Normal { mean, sigma } => {
                Some((mean - 4.0 * sigma, mean + 4.0 * sigma))
            }
        }
    }
}

fn positive_unit(source: &mut dyn UnitSource) -> f64 {
    let u = source.next_unit();
    if u <= f64::MIN_POSITIVE {
        f64::MIN_POSITIVE
    } else {
        u
    }
}

/// Acklam's rational approximation of the standard normal quantile,
/// accurate to about 1e-9 on `(0, 1)`.
fn standard_normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const LOW: f64 = 0.024_25;

    fn horner(coefficients: &[f64], x: f64) -> f64 {
        coefficients
            .iter()
            .fold(0.0, |acc, coefficient| acc * x + coefficient)
    }
    fn tail(q: f64) -> f64 {
        horner(&C, q) / (horner(&D, q) * q + 1.0)
    }

    if p < LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        horner(&A, r) * q / (horner(&B, r) * r + 1.0)
    }
}

/// Lanczos approximation (g = 7, n = 9).
fn gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        std::f64::consts::PI / ((std::f64::consts::PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let t = x + 7.5;
        let series = COEFFICIENTS
            .iter()
            .enumerate()
            .skip(1)
            .fold(COEFFICIENTS[0], |acc, (idx, coefficient)| {
                acc + coefficient / (x + idx as f64)
            });
        (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * series
    }
}

/// Creates the unit source for one stream. Seeded streams get distinct
/// seeds; congruential streams each restart from the configured state.
pub fn build_source(
    generator: &GeneratorConfig,
    seed: Option<u64>,
    stream: u64,
) -> Result<Box<dyn UnitSource>> {
    match *generator {
        GeneratorConfig::Seeded => {
            let seed = seed.unwrap_or(0).wrapping_add(stream);
            Ok(Box::new(SeededSource::new(StdRng::seed_from_u64(seed))))
        }
        GeneratorConfig::Congruential {
            multiplier,
            increment,
            modulus,
            seed,
        } => Ok(Box::new(CongruentialRng::new(
            multiplier, increment, modulus, seed,
        )?)),
    }
}

/// Cycle length of a congruential generator; `Ok(None)` for seeded
/// generators or when no state repeats within [`PERIOD_SEARCH_LIMIT`].
pub fn generator_period(generator: &GeneratorConfig) -> Result<Option<usize>> {
    match *generator {
        GeneratorConfig::Seeded => Ok(None),
        GeneratorConfig::Congruential {
            multiplier,
            increment,
            modulus,
            seed,
        } => {
            let rng = CongruentialRng::new(multiplier, increment, modulus, seed)?;
            Ok(rng.period(PERIOD_SEARCH_LIMIT))
        }
    }
}

pub fn sample_many(
    distribution: &Distribution,
    source: &mut dyn UnitSource,
    count: usize,
) -> Vec<f64> {
    (0..count).map(|_| distribution.sample(source)).collect()
}

/// Running sum of inter-arrival gaps, starting from time 0.
pub fn accumulate_arrivals(interarrivals: &[f64]) -> Vec<f64> {
    interarrivals
        .iter()
        .scan(0.0, |time, gap| {
            *time += gap;
            Some(*time)
        })
        .collect()
}

pub fn build_input(config: &SimConfig) -> Result<SimulationInput> {
    if config.buffer_capacity < 0 {
        return Err(Error::NegativeBufferCapacity(config.buffer_capacity));
    }
    if config.jobs == Some(0) {
        return Err(Error::JobsZero);
    }

    let arrivals = match &config.arrivals {
        ArrivalSource::Times(times) => times.clone(),
        ArrivalSource::Interarrival(distribution) => {
            distribution.validate()?;
            let jobs = config.jobs.ok_or(Error::JobsRequired("arrivals"))?;
            let mut source = build_source(&config.generator, config.seed, 0)?;
            let gaps = sample_many(distribution, source.as_mut(), jobs);
            accumulate_arrivals(&gaps)
        }
    };

    let services = match &config.service {
        ServiceSource::Durations(durations) => durations.clone(),
        ServiceSource::Sampled(distribution) => {
            distribution.validate()?;
            let jobs = match (&config.arrivals, config.jobs) {
                (_, Some(jobs)) => jobs,
                (ArrivalSource::Times(times), None) => times.len(),
                (ArrivalSource::Interarrival(_), None) => {
                    return Err(Error::JobsRequired("service durations"))
                }
            };
            let mut source = build_source(&config.generator, config.seed, 1)?;
            sample_many(distribution, source.as_mut(), jobs)
        }
    };

    debug!(
        arrivals = arrivals.len(),
        services = services.len(),
        generator = %config.generator,
        "built workload"
    );

    Ok(SimulationInput {
        arrivals,
        services,
        // Anything past usize::MAX is unbounded in practice.
        buffer_capacity: usize::try_from(config.buffer_capacity).unwrap_or(usize::MAX),
    })
}

/// Draws `check.samples` values and measures how well their histogram
/// follows the distribution's density.
pub fn check_density(check: &DensityCheck) -> Result<DensityFit> {
    check.distribution.validate()?;
    if check.samples == 0 {
        return Err(Error::SamplesZero);
    }
    let default_range = check.distribution.density_range();
    let lower = check.lower.or(default_range.map(|(lower, _)| lower));
    let upper = check.upper.or(default_range.map(|(_, upper)| upper));
    let (lower, upper) = lower
        .zip(upper)
        .ok_or_else(|| Error::NoDensity(check.distribution.to_string()))?;

    let mut source = build_source(&check.generator, check.seed, 0)?;
    let samples = sample_many(&check.distribution, source.as_mut(), check.samples);
    debug!(
        distribution = %check.distribution,
        samples = samples.len(),
        bins = check.bins,
        "sampled distribution for density check"
    );
    DensityFit::measure(&check.distribution, &samples, check.bins, lower, upper)
}

pub fn describe_arrivals(source: &ArrivalSource) -> String {
    match source {
        ArrivalSource::Times(times) => format!("explicit({} times)", times.len()),
        ArrivalSource::Interarrival(distribution) => format!("interarrival {}", distribution),
    }
}

pub fn describe_service(source: &ServiceSource) -> String {
    match source {
        ServiceSource::Durations(durations) => format!("explicit({} durations)", durations.len()),
        ServiceSource::Sampled(distribution) => distribution.to_string(),
    }
}
