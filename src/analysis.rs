use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Distribution, SimulationInput};
use crate::state::SimulationResult;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkloadSummary {
    pub jobs: usize,
    pub mean_interarrival: f64,
    pub mean_service: f64,
    /// `mean_service / mean_interarrival`.
    pub offered_load: f64,
}

impl WorkloadSummary {
    pub fn from_input(input: &SimulationInput) -> Self {
        let jobs = input.arrivals.len();
        // Gaps telescope: the first gap is measured from time 0.
        let mean_interarrival = match input.arrivals.last() {
            Some(&last) => last / jobs as f64,
            None => 0.0,
        };
        let mean_service = mean(&input.services);
        let offered_load = if mean_interarrival > 0.0 {
            mean_service / mean_interarrival
        } else {
            0.0
        };

        Self {
            jobs,
            mean_interarrival,
            mean_service,
            offered_load,
        }
    }
}

/// Steady-state values of an M/M/1 queue with unbounded buffer at the given
/// load, for comparison against exponential workloads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mm1Reference {
    pub load: f64,
    pub idle_probability: f64,
    pub mean_queue_length: f64,
    pub mean_in_system: f64,
    pub mean_waiting_time: f64,
}

impl Mm1Reference {
    /// `None` unless `0 < load < 1`.
    pub fn new(load: f64, mean_service: f64) -> Option<Self> {
        if !(load > 0.0 && load < 1.0) || !(mean_service > 0.0) {
            return None;
        }
        Some(Self {
            load,
            idle_probability: 1.0 - load,
            mean_queue_length: load * load / (1.0 - load),
            mean_in_system: load / (1.0 - load),
            // rho / (mu (1 - rho)) with mu = 1 / mean_service
            mean_waiting_time: load * mean_service / (1.0 - load),
        })
    }

    pub fn for_workload(workload: &WorkloadSummary) -> Option<Self> {
        Self::new(workload.offered_load, workload.mean_service)
    }
}

/// Measured values next to their M/M/1 counterparts. Errors are relative:
/// `|measured - reference| / reference`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mm1Comparison {
    pub queue_length: f64,
    pub queue_length_error: f64,
    pub waiting_time: f64,
    pub waiting_time_error: f64,
    pub idle_probability: f64,
    pub idle_probability_error: f64,
}

impl Mm1Comparison {
    pub fn measure(reference: &Mm1Reference, result: &SimulationResult) -> Self {
        let queue_length = result.mean_queue_length();
        let waiting_time = result.average_waiting_time();
        let idle_probability = 1.0 - result.server_utilization();

        Self {
            queue_length,
            queue_length_error: relative_error(queue_length, reference.mean_queue_length),
            waiting_time,
            waiting_time_error: relative_error(waiting_time, reference.mean_waiting_time),
            idle_probability,
            idle_probability_error: relative_error(idle_probability, reference.idle_probability),
        }
    }
}

fn relative_error(measured: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    (measured - reference).abs() / reference.abs()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population mean and variance of a sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SampleStatistics {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl SampleStatistics {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                variance: 0.0,
                std_dev: 0.0,
            };
        }
        let mean = mean(samples);
        let variance = samples
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / samples.len() as f64;
        Self {
            count: samples.len(),
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}

/// Histogram of `samples` over `[lower, upper]` normalised to a density:
/// each bin holds `hits / (n * width)`. Samples outside the range still
/// count towards `n`; the upper edge belongs to the last bin.
pub fn empirical_density(samples: &[f64], bins: usize, lower: f64, upper: f64) -> Vec<f64> {
    if bins == 0 || samples.is_empty() || !(upper > lower) {
        return vec![0.0; bins];
    }
    let mut counts = vec![0u64; bins];
    let width = (upper - lower) / bins as f64;

    for &value in samples {
        if value < lower || value > upper {
            continue;
        }
        let index = (((value - lower) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    let scale = samples.len() as f64 * width;
    counts.into_iter().map(|count| count as f64 / scale).collect()
}

/// Midpoints of `bins` equal-width bins over `[lower, upper]`.
pub fn bin_centers(bins: usize, lower: f64, upper: f64) -> Vec<f64> {
    let width = (upper - lower) / bins as f64;
    (0..bins)
        .map(|index| lower + (index as f64 + 0.5) * width)
        .collect()
}

/// Root-mean-square difference of two equally long series.
pub fn rmse(measured: &[f64], expected: &[f64]) -> Option<f64> {
    if measured.is_empty() || measured.len() != expected.len() {
        return None;
    }
    let sum = measured
        .iter()
        .zip(expected)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>();
    Some((sum / measured.len() as f64).sqrt())
}

/// How closely a generated sample follows the density it was drawn from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DensityFit {
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
    pub sample: SampleStatistics,
    pub expected_mean: f64,
    pub expected_variance: f64,
    pub rmse: f64,
}

impl DensityFit {
    pub fn measure(
        distribution: &Distribution,
        samples: &[f64],
        bins: usize,
        lower: f64,
        upper: f64,
    ) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidFitRange("bins must be > 0".to_string()));
        }
        if !(lower.is_finite() && upper.is_finite() && upper > lower) {
            return Err(Error::InvalidFitRange(format!(
                "expected finite lower < upper (got {}, {})",
                lower, upper
            )));
        }

        let expected = bin_centers(bins, lower, upper)
            .into_iter()
            .map(|x| distribution.pdf(x))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| Error::NoDensity(distribution.to_string()))?;
        let measured = empirical_density(samples, bins, lower, upper);
        let rmse = rmse(&measured, &expected).unwrap_or(0.0);

        Ok(Self {
            bins,
            lower,
            upper,
            sample: SampleStatistics::from_samples(samples),
            expected_mean: distribution.mean(),
            expected_variance: distribution.variance(),
            rmse,
        })
    }
}
