use queue_sim::config::{self, CheckArgs, Command, FormatArg, RunArgs};
use queue_sim::engine;
use queue_sim::error::Result;
use queue_sim::logging;
use queue_sim::models::{ArrivalSource, Distribution, ServiceSource, SimConfig};
use queue_sim::output::{self, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter};
use queue_sim::sources::PERIOD_SEARCH_LIMIT;
use queue_sim::workload;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;
    logging::init_logging(cli.verbose);

    match cli.command {
        Some(Command::Run(args)) => run_simulation(args),
        Some(Command::ShowConfig(args)) => show_config(args),
        Some(Command::ListDistributions) => {
            for name in Distribution::NAMES {
                println!("{}", name);
            }
            Ok(())
        }
        Some(Command::CheckDistribution(args)) => check_distribution(args),
        None => run_simulation(cli.run),
    }
}

fn run_simulation(args: RunArgs) -> Result<()> {
    let (config, format) = config::build_config(args)?;
    let report = engine::run_from_config(&config)?;

    let formatter = formatter_for(&format);
    print!("{}", formatter.write(&report));
    Ok(())
}

fn show_config(args: RunArgs) -> Result<()> {
    let (config, _) = config::build_config(args)?;
    print!("{}", describe_config(&config)?);
    Ok(())
}

fn check_distribution(args: CheckArgs) -> Result<()> {
    let check = config::build_check(args)?;
    let fit = workload::check_density(&check)?;
    print!("{}", output::write_density_fit(&check.distribution, &fit));
    Ok(())
}

fn describe_config(config: &SimConfig) -> Result<String> {
    let arrivals = match &config.arrivals {
        ArrivalSource::Times(times) => format!("{} explicit times", times.len()),
        ArrivalSource::Interarrival(distribution) => format!(
            "interarrival {} (mean {:.4})",
            distribution,
            distribution.mean()
        ),
    };
    let service = match &config.service {
        ServiceSource::Durations(durations) => format!("{} explicit durations", durations.len()),
        ServiceSource::Sampled(distribution) => {
            format!("{} (mean {:.4})", distribution, distribution.mean())
        }
    };
    let jobs = match config.jobs {
        Some(jobs) => jobs.to_string(),
        None => "from arrivals".to_string(),
    };
    let seed = match config.seed {
        Some(seed) => seed.to_string(),
        None => "none".to_string(),
    };
    let generator = match workload::generator_period(&config.generator)? {
        Some(period) => format!("{} (period {})", config.generator, period),
        None if config.generator.is_congruential() => format!(
            "{} (period above {})",
            config.generator, PERIOD_SEARCH_LIMIT
        ),
        None => config.generator.to_string(),
    };

    Ok(format!(
        "Arrivals: {}\nService: {}\nJobs: {}\nBuffer capacity: {}\nGenerator: {}\nSeed: {}\nDetailed: {}\nTie epsilon: {:e}\n",
        arrivals,
        service,
        jobs,
        config.buffer_capacity,
        generator,
        seed,
        config.detailed,
        config.tie_epsilon
    ))
}

fn formatter_for(format: &FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}
