use tracing::{debug, info, trace};

use crate::analysis::{Mm1Comparison, Mm1Reference, WorkloadSummary};
use crate::error::{Error, Result};
use crate::events::{Event, ScheduledEvent};
use crate::models::{SimConfig, SimOptions, SimulationInput};
use crate::state::{
    Buffer, JobOutcome, JobRecord, OccupancyStats, RunMetadata, RunReport, ServerState,
    SimulationResult, WaitingJob,
};
use crate::workload;

/// Single-server queue with a bounded FIFO buffer, driven by next-event
/// time advance over a fixed arrival log.
pub struct QueueSimulator {
    input: SimulationInput,
    options: SimOptions,
    clock: f64,
    last_event_time: f64,
    next_arrival: usize,
    next_service: usize,
    server: ServerState,
    buffer: Buffer,
    occupancy: OccupancyStats,
    busy_time: f64,
    total_arrived: u64,
    processed: u64,
    lost: u64,
    served: u64,
    total_waiting_time: f64,
    waiting_times: Vec<f64>,
    jobs: Vec<JobRecord>,
}

impl QueueSimulator {
    pub fn new(input: SimulationInput, options: SimOptions) -> Result<Self> {
        validate_input(&input)?;
        validate_options(&options)?;

        let capacity = input.buffer_capacity;
        let job_count = input.arrivals.len();
        let (waiting_times, jobs) = if options.detailed {
            (Vec::with_capacity(job_count), Vec::with_capacity(job_count))
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            input,
            options,
            clock: 0.0,
            last_event_time: 0.0,
            next_arrival: 0,
            next_service: 0,
            server: ServerState::idle(),
            buffer: Buffer::new(capacity),
            occupancy: OccupancyStats::new(capacity, job_count),
            busy_time: 0.0,
            total_arrived: 0,
            processed: 0,
            lost: 0,
            served: 0,
            total_waiting_time: 0.0,
            waiting_times,
            jobs,
        })
    }

    pub fn run(mut self) -> Result<SimulationResult> {
        info!(
            jobs = self.input.arrivals.len(),
            buffer_capacity = self.input.buffer_capacity,
            detailed = self.options.detailed,
            "starting simulation"
        );

        while self.has_pending_work() {
            let arrival = self
                .input
                .arrivals
                .get(self.next_arrival)
                .map(|&time| ScheduledEvent::new(time, Event::Arrival { job: self.next_arrival }));
            let departure = self
                .server
                .scheduled_departure()
                .map(|time| ScheduledEvent::new(time, Event::Departure));

            let next = match (departure, arrival) {
                (Some(departure), Some(arrival)) => departure.min(arrival),
                (Some(departure), None) => departure,
                (None, Some(arrival)) => arrival,
                (None, None) => break,
            };
            let now = next.time;
            self.advance_clock(now);

            let mut due = [departure, arrival];
            due.sort_by_key(|event| event.map(|event| event.event.priority()));
            for event in due.into_iter().flatten() {
                if !event.coincides_with(now, self.options.tie_epsilon) {
                    continue;
                }
                match event.event {
                    Event::Departure => self.depart()?,
                    Event::Arrival { job } => self.arrive(job)?,
                }
            }
        }

        info!(
            final_time = self.clock,
            arrived = self.total_arrived,
            processed = self.processed,
            lost = self.lost,
            "simulation finished"
        );
        Ok(self.into_result())
    }

    fn has_pending_work(&self) -> bool {
        self.next_arrival < self.input.arrivals.len() || !self.buffer.is_empty() || self.server.busy
    }

    /// Charges the interval since the previous event to the level the
    /// system held during it.
    fn advance_clock(&mut self, now: f64) {
        let elapsed = now - self.last_event_time;
        let level = self.level();
        self.occupancy.record(level, elapsed);
        if self.server.busy {
            self.busy_time += elapsed;
        }
        self.last_event_time = now;
        self.clock = now;
    }

    fn level(&self) -> usize {
        self.buffer.len() + usize::from(self.server.busy)
    }

    fn depart(&mut self) -> Result<()> {
        trace!(time = self.clock, level = self.level(), "departure");
        self.server.release();
        self.processed += 1;

        if let Some(waiting) = self.buffer.pop() {
            self.start_service(waiting, JobOutcome::ServedAfterWait)?;
        }
        Ok(())
    }

    fn arrive(&mut self, job: usize) -> Result<()> {
        let arrival_time = self.input.arrivals[job];
        trace!(time = self.clock, job, level = self.level(), "arrival");
        self.total_arrived += 1;
        self.next_arrival += 1;

        let waiting = WaitingJob { job, arrival_time };
        if !self.server.busy {
            self.start_service(waiting, JobOutcome::ServedImmediately)?;
        } else if !self.buffer.try_push(waiting) {
            debug!(time = self.clock, job, "buffer full, job lost");
            self.lost += 1;
            if self.options.detailed {
                self.jobs.push(JobRecord {
                    job,
                    arrival_time,
                    outcome: JobOutcome::Lost,
                    service_start: None,
                    departure_time: None,
                });
            }
        }
        Ok(())
    }

    fn start_service(&mut self, waiting: WaitingJob, outcome: JobOutcome) -> Result<()> {
        let duration = self
            .input
            .services
            .get(self.next_service)
            .copied()
            .ok_or(Error::ServicePoolExhausted {
                job: waiting.job,
                available: self.input.services.len(),
            })?;
        self.next_service += 1;

        let wait = match outcome {
            JobOutcome::ServedImmediately => 0.0,
            _ => self.clock - waiting.arrival_time,
        };
        let departure_time = self.clock + duration;
        self.server.occupy(departure_time);
        self.served += 1;
        self.total_waiting_time += wait;

        if self.options.detailed {
            self.waiting_times.push(wait);
            self.jobs.push(JobRecord {
                job: waiting.job,
                arrival_time: waiting.arrival_time,
                outcome,
                service_start: Some(self.clock),
                departure_time: Some(departure_time),
            });
        }
        Ok(())
    }

    fn into_result(mut self) -> SimulationResult {
        let detailed = self.options.detailed;
        if detailed {
            self.jobs.sort_by_key(|record| record.job);
        }
        SimulationResult {
            buffer_capacity: self.input.buffer_capacity,
            final_time: self.clock,
            busy_time: self.busy_time,
            occupancy: self.occupancy,
            total_arrived: self.total_arrived,
            processed: self.processed,
            lost: self.lost,
            served: self.served,
            total_waiting_time: self.total_waiting_time,
            waiting_times: detailed.then_some(self.waiting_times),
            jobs: detailed.then_some(self.jobs),
        }
    }
}

pub fn run_simulation(input: &SimulationInput) -> Result<SimulationResult> {
    run_simulation_with_options(input, &SimOptions::default())
}

pub fn run_simulation_with_options(
    input: &SimulationInput,
    options: &SimOptions,
) -> Result<SimulationResult> {
    QueueSimulator::new(input.clone(), *options)?.run()
}

/// Builds the workload described by `config`, runs it and attaches the
/// workload analysis.
pub fn run_from_config(config: &SimConfig) -> Result<RunReport> {
    let options = SimOptions {
        detailed: config.detailed,
        tie_epsilon: config.tie_epsilon,
    };
    validate_options(&options)?;

    let input = workload::build_input(config)?;
    let workload = WorkloadSummary::from_input(&input);
    let result = QueueSimulator::new(input, options)?.run()?;
    let mm1_reference = Mm1Reference::for_workload(&workload);
    let mm1_comparison = mm1_reference
        .as_ref()
        .map(|reference| Mm1Comparison::measure(reference, &result));

    Ok(RunReport {
        metadata: RunMetadata {
            buffer_capacity: result.buffer_capacity,
            jobs: workload.jobs,
            arrivals: workload::describe_arrivals(&config.arrivals),
            service: workload::describe_service(&config.service),
            generator: config.generator.to_string(),
            detailed: config.detailed,
        },
        mm1_reference,
        mm1_comparison,
        workload,
        result,
    })
}

pub fn validate_input(input: &SimulationInput) -> Result<()> {
    if input.arrivals.is_empty() && !input.services.is_empty() {
        return Err(Error::ServicesWithoutArrivals);
    }

    let mut previous: Option<f64> = None;
    for (index, &value) in input.arrivals.iter().enumerate() {
        if !value.is_finite() {
            return Err(Error::NonFiniteArrival { index, value });
        }
        if value < 0.0 {
            return Err(Error::NegativeArrival { index, value });
        }
        if let Some(previous) = previous {
            if value <= previous {
                return Err(Error::NonIncreasingArrival {
                    index,
                    previous,
                    current: value,
                });
            }
        }
        previous = Some(value);
    }

    for (index, &value) in input.services.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidServiceDuration { index, value });
        }
    }

    Ok(())
}

fn validate_options(options: &SimOptions) -> Result<()> {
    if !options.tie_epsilon.is_finite() || options.tie_epsilon < 0.0 {
        return Err(Error::InvalidTieEpsilon(options.tie_epsilon));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArrivalSource, Distribution, GeneratorConfig, ServiceSource};

    const TOLERANCE: f64 = 1e-9;

    fn input(arrivals: &[f64], services: &[f64], buffer_capacity: usize) -> SimulationInput {
        SimulationInput {
            arrivals: arrivals.to_vec(),
            services: services.to_vec(),
            buffer_capacity,
        }
    }

    fn assert_invariants(result: &SimulationResult) {
        let total: f64 = result.occupancy.time.iter().sum();
        assert!(
            (total - result.final_time()).abs() <= TOLERANCE * result.final_time().max(1.0),
            "occupancy total {} != final time {}",
            total,
            result.final_time()
        );
        assert_eq!(
            result.total_arrived(),
            result.processed() + result.lost(),
            "jobs left in transit"
        );
        if result.final_time() > 0.0 {
            let probability: f64 = result.occupancy_probabilities().iter().sum();
            assert!((probability - 1.0).abs() < TOLERANCE);
        }
    }

    fn generated_config(buffer_capacity: i64, seed: u64) -> SimConfig {
        SimConfig {
            arrivals: ArrivalSource::Interarrival(Distribution::Exponential { rate: 1.0 / 3.0 }),
            service: ServiceSource::Sampled(Distribution::Exponential { rate: 1.0 / 4.0 }),
            jobs: Some(2_000),
            buffer_capacity,
            generator: GeneratorConfig::Seeded,
            seed: Some(seed),
            detailed: true,
            tie_epsilon: 1e-9,
        }
    }

    #[test]
    fn full_buffer_loses_third_job() {
        let result = run_simulation_with_options(
            &input(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0], 1),
            &SimOptions::detailed(),
        )
        .expect("simulation should succeed");

        assert_eq!(result.total_arrived(), 3);
        assert_eq!(result.processed(), 2);
        assert_eq!(result.lost(), 1);
        assert_eq!(result.final_time(), 10.0);
        assert_eq!(result.waiting_times(), Some(&[0.0, 4.0][..]));
        assert_eq!(result.average_waiting_time(), 2.0);
        assert_eq!(result.server_utilization(), 1.0);

        assert_eq!(result.occupancy_time(0), 0.0);
        assert_eq!(result.occupancy_time(1), 6.0);
        assert_eq!(result.occupancy_time(2), 4.0);
        assert_eq!(result.occupancy_count(0), 1);
        assert_eq!(result.occupancy_count(1), 2);
        assert_eq!(result.occupancy_count(2), 2);
        assert_eq!(result.occupancy_probability(1), 0.6);
        assert!((result.mean_occupancy() - 1.4).abs() < TOLERANCE);

        let jobs = result.jobs().expect("detailed mode keeps job records");
        let outcomes = jobs.iter().map(|record| record.outcome).collect::<Vec<_>>();
        assert_eq!(
            outcomes,
            vec![
                JobOutcome::ServedImmediately,
                JobOutcome::ServedAfterWait,
                JobOutcome::Lost
            ]
        );
        assert_eq!(jobs[1].service_start, Some(5.0));
        assert_eq!(jobs[1].departure_time, Some(10.0));
        assert_eq!(jobs[1].waiting_time(), Some(4.0));
        assert_invariants(&result);
    }

    #[test]
    fn spaced_arrivals_never_wait() {
        let result = run_simulation(&input(&[0.0, 10.0, 20.0], &[1.0, 1.0, 1.0], 0))
            .expect("simulation should succeed");

        assert_eq!(result.lost(), 0);
        assert_eq!(result.processed(), 3);
        assert_eq!(result.average_waiting_time(), 0.0);
        assert_eq!(result.final_time(), 21.0);
        assert_eq!(result.busy_time(), 3.0);
        assert!((result.server_utilization() - 3.0 / 21.0).abs() < TOLERANCE);
        assert_eq!(result.occupancy_time(0), 18.0);
        assert_eq!(result.occupancy_time(1), 3.0);
        assert_invariants(&result);
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let result = run_simulation(&input(&[], &[], 3)).expect("simulation should succeed");

        assert_eq!(result.processed(), 0);
        assert_eq!(result.lost(), 0);
        assert_eq!(result.total_arrived(), 0);
        assert_eq!(result.final_time(), 0.0);
        assert_eq!(result.occupancy_probability(0), 0.0);
        assert_eq!(result.server_utilization(), 0.0);
        assert_eq!(result.average_waiting_time(), 0.0);
        assert_eq!(result.mean_occupancy(), 0.0);
        assert_invariants(&result);
    }

    #[test]
    fn departure_resolves_before_simultaneous_arrival() {
        let result = run_simulation(&input(&[0.0, 5.0], &[5.0, 2.0], 0))
            .expect("simulation should succeed");

        assert_eq!(result.lost(), 0);
        assert_eq!(result.processed(), 2);
        assert_eq!(result.final_time(), 7.0);
        assert_eq!(result.occupancy_time(1), 7.0);
        assert_eq!(result.occupancy_count(1), 2);
        assert_invariants(&result);
    }

    #[test]
    fn tie_epsilon_controls_near_simultaneous_events() {
        let arrivals = [0.0, 4.999999999999];
        let services = [5.0, 2.0];

        let tolerant = run_simulation(&input(&arrivals, &services, 0))
            .expect("simulation should succeed");
        assert_eq!(tolerant.lost(), 0);

        let exact = run_simulation_with_options(
            &input(&arrivals, &services, 0),
            &SimOptions {
                detailed: false,
                tie_epsilon: 0.0,
            },
        )
        .expect("simulation should succeed");
        assert_eq!(exact.lost(), 1);
        assert_invariants(&exact);
    }

    #[test]
    fn zero_capacity_loses_arrivals_inside_busy_intervals() {
        let arrivals = [0.0, 1.0, 2.0, 3.5, 6.0, 6.5];
        let services = [3.0; 6];
        let result = run_simulation_with_options(
            &input(&arrivals, &services, 0),
            &SimOptions::detailed(),
        )
        .expect("simulation should succeed");

        let jobs = result.jobs().expect("detailed mode keeps job records");
        let busy = jobs
            .iter()
            .filter_map(|record| record.service_start.zip(record.departure_time))
            .collect::<Vec<_>>();
        let inside = arrivals
            .iter()
            .filter(|&&time| busy.iter().any(|&(start, end)| time > start && time < end))
            .count();

        assert_eq!(result.lost(), 3);
        assert_eq!(result.lost() as usize, inside);
        assert_eq!(result.occupancy_time(2), 0.0);
        assert_invariants(&result);
    }

    #[test]
    fn basic_mode_skips_per_job_records() {
        let result = run_simulation(&input(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0], 1))
            .expect("simulation should succeed");
        assert!(result.waiting_times().is_none());
        assert!(result.jobs().is_none());
        assert_eq!(result.average_waiting_time(), 2.0);
    }

    #[test]
    fn rerun_produces_identical_statistics() {
        let config = generated_config(10, 7);
        let first = run_from_config(&config).expect("simulation should succeed");
        let second = run_from_config(&config).expect("simulation should succeed");
        assert_eq!(first.result, second.result);
    }

    #[test]
    fn generated_workload_keeps_invariants() {
        for capacity in [0, 1, 5, 10] {
            let report =
                run_from_config(&generated_config(capacity, 42)).expect("simulation should succeed");
            let result = &report.result;
            assert_eq!(result.total_arrived(), 2_000);
            assert_eq!(result.occupancy.levels(), capacity as usize + 2);
            assert_eq!(
                result.waiting_times().map(|times| times.len()),
                Some(result.processed() as usize)
            );
            assert!(result.server_utilization() > 0.0 && result.server_utilization() <= 1.0);
            assert_invariants(result);
        }
    }

    #[test]
    fn unbounded_buffer_capacity_runs_without_allocating_it() {
        for capacity in [1 << 40, usize::MAX] {
            let result = run_simulation(&input(&[0.0, 1.0, 2.0], &[5.0; 3], capacity))
                .expect("simulation should succeed");

            assert_eq!(result.lost(), 0);
            assert_eq!(result.processed(), 3);
            assert_eq!(result.final_time(), 15.0);
            assert_eq!(result.occupancy.levels(), 5);
            assert_eq!(result.occupancy_time(3), 3.0);
            assert_eq!(result.occupancy_time(capacity), 0.0);
            assert_invariants(&result);
        }
    }

    #[test]
    fn near_tie_immediate_service_records_zero_wait() {
        let result = run_simulation_with_options(
            &input(&[0.0, 5.0000000000001], &[5.0, 2.0], 0),
            &SimOptions::detailed(),
        )
        .expect("simulation should succeed");

        let jobs = result.jobs().expect("detailed mode keeps job records");
        assert_eq!(jobs[1].outcome, JobOutcome::ServedImmediately);
        // Service starts at the departure instant, just before the arrival stamp.
        assert_eq!(jobs[1].service_start, Some(5.0));
        assert_eq!(jobs[1].waiting_time(), Some(0.0));
        assert_eq!(result.waiting_times(), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn exhausted_service_pool_fails() {
        let err = run_simulation(&input(&[0.0, 1.0, 2.0], &[5.0], 2)).unwrap_err();
        assert!(matches!(
            err,
            Error::ServicePoolExhausted {
                job: 1,
                available: 1
            }
        ));
    }

    #[test]
    fn service_pool_only_needs_served_jobs() {
        let result = run_simulation(&input(&[0.0, 1.0, 2.0], &[5.0, 5.0], 1))
            .expect("lost jobs draw no service duration");
        assert_eq!(result.lost(), 1);
    }

    #[test]
    fn non_increasing_arrivals_are_rejected() {
        let err = run_simulation(&input(&[0.0, 2.0, 2.0], &[1.0; 3], 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "arrival times must be strictly increasing (job 2: 2 after 2)"
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            run_simulation(&input(&[-1.0], &[1.0], 1)).unwrap_err(),
            Error::NegativeArrival { index: 0, .. }
        ));
        assert!(matches!(
            run_simulation(&input(&[0.0, f64::NAN], &[1.0; 2], 1)).unwrap_err(),
            Error::NonFiniteArrival { index: 1, .. }
        ));
        assert!(matches!(
            run_simulation(&input(&[0.0], &[-2.0], 1)).unwrap_err(),
            Error::InvalidServiceDuration { index: 0, .. }
        ));
        assert!(matches!(
            run_simulation(&input(&[], &[1.0], 1)).unwrap_err(),
            Error::ServicesWithoutArrivals
        ));
    }

    #[test]
    fn invalid_epsilon_is_rejected() {
        let options = SimOptions {
            detailed: false,
            tie_epsilon: -1.0,
        };
        let err = run_simulation_with_options(&input(&[0.0], &[1.0], 0), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidTieEpsilon(_)));
    }

    #[test]
    fn report_carries_metadata_and_workload() {
        let config = SimConfig {
            arrivals: ArrivalSource::Times(vec![0.0, 1.0, 2.0]),
            service: ServiceSource::Sampled(Distribution::Fixed { value: 5.0 }),
            jobs: None,
            buffer_capacity: 1,
            generator: GeneratorConfig::Seeded,
            seed: None,
            detailed: false,
            tie_epsilon: 1e-9,
        };
        let report = run_from_config(&config).expect("simulation should succeed");
        assert_eq!(report.metadata.jobs, 3);
        assert_eq!(report.metadata.buffer_capacity, 1);
        assert_eq!(report.workload.mean_service, 5.0);
        assert!(report.mm1_reference.is_none());
        assert!(report.mm1_comparison.is_none());
        assert_eq!(report.result.lost(), 1);
        assert!((report.result.loss_probability() - 1.0 / 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn stable_exponential_workload_is_compared_with_mm1() {
        let mut config = generated_config(1_000, 11);
        config.arrivals =
            ArrivalSource::Interarrival(Distribution::Exponential { rate: 1.0 / 6.0 });
        config.jobs = Some(20_000);
        config.detailed = false;
        let report = run_from_config(&config).expect("simulation should succeed");

        let reference = report.mm1_reference.as_ref().expect("load is below 1");
        let comparison = report.mm1_comparison.as_ref().expect("reference present");
        assert!(reference.load > 0.5 && reference.load < 1.0);
        assert_eq!(report.result.lost(), 0);
        assert_eq!(
            comparison.idle_probability,
            1.0 - report.result.server_utilization()
        );
        assert_eq!(comparison.waiting_time, report.result.average_waiting_time());
        // Long runs land near the closed forms.
        assert!(comparison.idle_probability_error < 0.25);
        assert!(comparison.waiting_time_error < 0.5);
    }
}
