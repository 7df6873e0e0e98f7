use serde::Serialize;
use std::collections::VecDeque;

use crate::analysis::{Mm1Comparison, Mm1Reference, WorkloadSummary};

#[derive(Clone, Debug)]
pub struct ServerState {
    pub busy: bool,
    pub departure_time: f64,
}

impl ServerState {
    pub fn idle() -> Self {
        Self {
            busy: false,
            departure_time: f64::INFINITY,
        }
    }

    pub fn scheduled_departure(&self) -> Option<f64> {
        if self.busy {
            Some(self.departure_time)
        } else {
            None
        }
    }

    pub fn release(&mut self) {
        self.busy = false;
        self.departure_time = f64::INFINITY;
    }

    pub fn occupy(&mut self, departure_time: f64) {
        self.busy = true;
        self.departure_time = departure_time;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaitingJob {
    pub job: usize,
    pub arrival_time: f64,
}

/// FIFO holding area; never grows beyond `capacity`. Storage grows with
/// the jobs actually queued, so `capacity` may be arbitrarily large.
#[derive(Clone, Debug)]
pub struct Buffer {
    capacity: usize,
    jobs: VecDeque<WaitingJob>,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            jobs: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Returns `false` and drops the job when the buffer is full.
    pub fn try_push(&mut self, job: WaitingJob) -> bool {
        if self.is_full() {
            return false;
        }
        self.jobs.push_back(job);
        true
    }

    pub fn pop(&mut self) -> Option<WaitingJob> {
        self.jobs.pop_front()
    }
}

/// Time-weighted occupancy table indexed by level `0..=capacity + 1`.
///
/// With `jobs` arrivals the level never exceeds `min(capacity, jobs) + 1`,
/// so the table is cut there; levels past its end read as zero.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OccupancyStats {
    pub time: Vec<f64>,
    pub entries: Vec<u64>,
}

impl OccupancyStats {
    pub fn new(buffer_capacity: usize, jobs: usize) -> Self {
        let levels = buffer_capacity.min(jobs).saturating_add(2);
        Self {
            time: vec![0.0; levels],
            entries: vec![0; levels],
        }
    }

    pub fn record(&mut self, level: usize, elapsed: f64) {
        self.time[level] += elapsed;
        self.entries[level] += 1;
    }

    pub fn levels(&self) -> usize {
        self.time.len()
    }

    pub fn total_time(&self) -> f64 {
        self.time.iter().sum()
    }

    /// Average length of one interval spent at `level`.
    pub fn mean_sojourn(&self, level: usize) -> f64 {
        match (self.time.get(level), self.entries.get(level)) {
            (Some(&time), Some(&count)) if count > 0 => time / count as f64,
            _ => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobOutcome {
    ServedImmediately,
    ServedAfterWait,
    Lost,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRecord {
    pub job: usize,
    pub arrival_time: f64,
    pub outcome: JobOutcome,
    pub service_start: Option<f64>,
    pub departure_time: Option<f64>,
}

impl JobRecord {
    /// Immediately served jobs wait exactly 0, even when the tie tolerance
    /// let service start a hair away from the arrival stamp.
    pub fn waiting_time(&self) -> Option<f64> {
        match self.outcome {
            JobOutcome::ServedImmediately => Some(0.0),
            JobOutcome::ServedAfterWait => {
                self.service_start.map(|start| start - self.arrival_time)
            }
            JobOutcome::Lost => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub buffer_capacity: usize,
    pub final_time: f64,
    pub busy_time: f64,
    pub occupancy: OccupancyStats,
    pub total_arrived: u64,
    pub processed: u64,
    pub lost: u64,
    pub served: u64,
    pub total_waiting_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_times: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobRecord>>,
}

impl SimulationResult {
    pub fn final_time(&self) -> f64 {
        self.final_time
    }

    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    pub fn occupancy_time(&self, level: usize) -> f64 {
        self.occupancy.time.get(level).copied().unwrap_or(0.0)
    }

    pub fn occupancy_count(&self, level: usize) -> u64 {
        self.occupancy.entries.get(level).copied().unwrap_or(0)
    }

    pub fn occupancy_probability(&self, level: usize) -> f64 {
        if self.final_time <= 0.0 {
            return 0.0;
        }
        self.occupancy_time(level) / self.final_time
    }

    pub fn occupancy_probabilities(&self) -> Vec<f64> {
        (0..self.occupancy.levels())
            .map(|level| self.occupancy_probability(level))
            .collect()
    }

    /// Time-averaged number of jobs in the system.
    pub fn mean_occupancy(&self) -> f64 {
        if self.final_time <= 0.0 {
            return 0.0;
        }
        self.occupancy
            .time
            .iter()
            .enumerate()
            .map(|(level, time)| level as f64 * time)
            .sum::<f64>()
            / self.final_time
    }

    pub fn total_arrived(&self) -> u64 {
        self.total_arrived
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Share of arrivals turned away by a full buffer.
    pub fn loss_probability(&self) -> f64 {
        if self.total_arrived == 0 {
            0.0
        } else {
            self.lost as f64 / self.total_arrived as f64
        }
    }

    pub fn mean_sojourn(&self, level: usize) -> f64 {
        self.occupancy.mean_sojourn(level)
    }

    /// Time-averaged number of jobs waiting in the buffer.
    pub fn mean_queue_length(&self) -> f64 {
        (self.mean_occupancy() - self.server_utilization()).max(0.0)
    }

    pub fn average_waiting_time(&self) -> f64 {
        if self.served == 0 {
            0.0
        } else {
            self.total_waiting_time / self.served as f64
        }
    }

    pub fn server_utilization(&self) -> f64 {
        if self.final_time <= 0.0 {
            0.0
        } else {
            self.busy_time / self.final_time
        }
    }

    pub fn waiting_times(&self) -> Option<&[f64]> {
        self.waiting_times.as_deref()
    }

    pub fn jobs(&self) -> Option<&[JobRecord]> {
        self.jobs.as_deref()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunMetadata {
    pub buffer_capacity: usize,
    pub jobs: usize,
    pub arrivals: String,
    pub service: String,
    pub generator: String,
    pub detailed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub workload: WorkloadSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mm1_reference: Option<Mm1Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mm1_comparison: Option<Mm1Comparison>,
    pub result: SimulationResult,
}
