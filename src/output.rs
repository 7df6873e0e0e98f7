use std::fmt::Write;

use crate::analysis::DensityFit;
use crate::models::Distribution;
use crate::state::{JobOutcome, JobRecord, RunReport};

pub trait Formatter {
    fn write(&self, report: &RunReport) -> String;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, report: &RunReport) -> String {
        let mut output = String::new();
        write_metadata(&mut output, report);
        write_counters(&mut output, report);
        write_workload(&mut output, report);
        write_occupancy(&mut output, report);
        if let Some(jobs) = report.result.jobs() {
            write_jobs(&mut output, jobs);
        }
        write_mm1_reference(&mut output, report);
        output
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &RunReport) -> String {
        let mut output = String::new();
        write_metadata(&mut output, report);
        write_counters(&mut output, report);
        output
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &RunReport) -> String {
        let mut output = serde_json::to_string_pretty(report)
            .unwrap_or_else(|err| format!("{{\"error\":\"{}\"}}", err));
        output.push('\n');
        output
    }
}

fn write_metadata(output: &mut String, report: &RunReport) {
    let metadata = &report.metadata;
    let _ = writeln!(output, "Metadata:");
    let _ = writeln!(output, "arrivals: {}", metadata.arrivals);
    let _ = writeln!(output, "service: {}", metadata.service);
    let _ = writeln!(output, "generator: {}", metadata.generator);
    let _ = writeln!(output, "buffer_capacity: {}", metadata.buffer_capacity);
    let _ = writeln!(output, "jobs: {}", metadata.jobs);
}

fn write_counters(output: &mut String, report: &RunReport) {
    let result = &report.result;
    let _ = writeln!(output, "Summary:");
    let _ = writeln!(output, "arrived: {}", result.total_arrived());
    let _ = writeln!(output, "processed: {}", result.processed());
    let _ = writeln!(output, "lost: {}", result.lost());
    let _ = writeln!(output, "loss_probability: {:.4}", result.loss_probability());
    let _ = writeln!(output, "final_time: {:.4}", result.final_time());
    let _ = writeln!(output, "avg_wait: {:.4}", result.average_waiting_time());
    let _ = writeln!(output, "utilization: {:.4}", result.server_utilization());
    let _ = writeln!(output, "mean_occupancy: {:.4}", result.mean_occupancy());
}

fn write_workload(output: &mut String, report: &RunReport) {
    let workload = &report.workload;
    let _ = writeln!(output, "Workload:");
    let _ = writeln!(output, "mean_interarrival: {:.4}", workload.mean_interarrival);
    let _ = writeln!(output, "mean_service: {:.4}", workload.mean_service);
    let _ = writeln!(output, "offered_load: {:.4}", workload.offered_load);
}

fn write_occupancy(output: &mut String, report: &RunReport) {
    let result = &report.result;
    let _ = writeln!(output, "Occupancy:");
    for level in 0..result.occupancy.levels() {
        let _ = writeln!(
            output,
            "{}: time {:.4}, entries {}, mean {:.4}, p {:.6}",
            level,
            result.occupancy_time(level),
            result.occupancy_count(level),
            result.mean_sojourn(level),
            result.occupancy_probability(level)
        );
    }
}

fn write_jobs(output: &mut String, jobs: &[JobRecord]) {
    let _ = writeln!(output, "Jobs:");
    for record in jobs {
        match (
            record.outcome,
            record.waiting_time(),
            record.service_start,
            record.departure_time,
        ) {
            (JobOutcome::Lost, _, _, _) => {
                let _ = writeln!(
                    output,
                    "Job {} @ {:.4}: lost",
                    record.job, record.arrival_time
                );
            }
            (_, Some(wait), Some(start), Some(departure)) => {
                let _ = writeln!(
                    output,
                    "Job {} @ {:.4}: wait {:.4}, served {:.4} -> {:.4}",
                    record.job, record.arrival_time, wait, start, departure
                );
            }
            _ => {}
        }
    }
}

fn write_mm1_reference(output: &mut String, report: &RunReport) {
    if let Some(reference) = &report.mm1_reference {
        let _ = writeln!(output, "M/M/1 reference:");
        let _ = writeln!(output, "idle_probability: {:.4}", reference.idle_probability);
        let _ = writeln!(output, "mean_queue_length: {:.4}", reference.mean_queue_length);
        let _ = writeln!(output, "mean_in_system: {:.4}", reference.mean_in_system);
        let _ = writeln!(output, "mean_waiting_time: {:.4}", reference.mean_waiting_time);
    }
    if let Some(comparison) = &report.mm1_comparison {
        let _ = writeln!(output, "M/M/1 comparison:");
        let _ = writeln!(
            output,
            "queue_length: {:.4} (error {:.2}%)",
            comparison.queue_length,
            comparison.queue_length_error * 100.0
        );
        let _ = writeln!(
            output,
            "waiting_time: {:.4} (error {:.2}%)",
            comparison.waiting_time,
            comparison.waiting_time_error * 100.0
        );
        let _ = writeln!(
            output,
            "idle_probability: {:.4} (error {:.2}%)",
            comparison.idle_probability,
            comparison.idle_probability_error * 100.0
        );
    }
}

pub fn write_density_fit(distribution: &Distribution, fit: &DensityFit) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Distribution: {}", distribution);
    let _ = writeln!(output, "Samples: {}", fit.sample.count);
    let _ = writeln!(
        output,
        "Range: [{:.4}, {:.4}] in {} bins",
        fit.lower, fit.upper, fit.bins
    );
    let _ = writeln!(
        output,
        "Mean: {:.4} (expected {:.4})",
        fit.sample.mean, fit.expected_mean
    );
    let _ = writeln!(
        output,
        "Variance: {:.4} (expected {:.4})",
        fit.sample.variance, fit.expected_variance
    );
    let _ = writeln!(output, "RMSE: {:.6}", fit.rmse);
    output
}
