use std::{env, path::Path, process};

use polycall::{
    cli::{self, CommandReport, take_flag, take_value},
    driver::{
        BenchmarkDriver, CaseOutcome, CaseReport, DriverConfig, Repetition,
        contention::ContentionReport,
    },
    error::UsageError,
};

fn main() {
    env_logger::init();
    let mut args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return;
    }
    let reuse_context = take_flag(&mut args, "--reuse-context");
    let verbose = take_flag(&mut args, "--verbose");
    let (iterations, config_path, callers) = match extract_values(&mut args) {
        Ok(values) => values,
        Err(err) => fail(err),
    };

    if args.len() != 7 {
        eprintln!(
            "Usage: {} <mode>[0-7] <language>[js|ruby] <lat1> <long1> <lat2> <long2>",
            args.first().map(String::as_str).unwrap_or("polycall")
        );
        process::exit(1);
    }

    let mut config = match &config_path {
        Some(path) => DriverConfig::load(Path::new(path)).unwrap_or_else(|err| fail(err)),
        None => DriverConfig::default(),
    };
    if reuse_context {
        config.reuse_context = true;
    }
    if let Some(iterations) = iterations {
        config.repetition = Repetition::Iterations(iterations);
    }

    // No runtime exists until mode and language have been validated.
    let mut driver = BenchmarkDriver::new(config);
    match cli::run_command(&mut driver, &args[1..], callers) {
        Ok(CommandReport::Case(report)) => print_case(&report, verbose),
        Ok(CommandReport::Contention(report)) => print_contention(&report),
        Err(err) => fail(err),
    }
}

fn print_case(report: &CaseReport, verbose: bool) {
    match &report.outcome {
        CaseOutcome::Completed { last_result, .. } => {
            println!("{:.2} km", last_result);
            if verbose {
                eprintln!("case: {}", report.case);
                eprintln!("samples: {}", report.samples().len());
                if let Some(mean) = report.mean() {
                    eprintln!("mean: {:?}", mean);
                }
            }
        }
        CaseOutcome::Failed { error, .. } => fail(error),
    }
}

type FlagValues = (Option<u64>, Option<String>, Option<usize>);

fn extract_values(args: &mut Vec<String>) -> Result<FlagValues, UsageError> {
    let iterations = take_value(args, "--iterations")
        .map_err(UsageError::Arguments)?
        .map(|value| {
            value.parse::<u64>().map_err(|_| {
                UsageError::Arguments("--iterations expects a non-negative integer".into())
            })
        })
        .transpose()?;
    let config = take_value(args, "--config").map_err(UsageError::Arguments)?;
    let callers = take_value(args, "--contention")
        .map_err(UsageError::Arguments)?
        .map(|value| match value.parse::<usize>() {
            Ok(callers) if callers > 0 => Ok(callers),
            _ => Err(UsageError::Arguments(
                "--contention expects a positive integer".into(),
            )),
        })
        .transpose()?;
    Ok((iterations, config, callers))
}

fn print_contention(report: &ContentionReport) {
    println!("policy: {}", report.policy);
    println!("language: {}", report.language);
    println!("callers: {}", report.callers);
    println!("evaluations: {}", report.evaluations);
    println!("cached entries: {}", report.cached_entries);
    if let Some(result) = report.results.last() {
        println!("{:.2} km", result);
    }
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{}", err);
    process::exit(1);
}

fn print_help() {
    println!(
        "\
polycall

Usage:
  polycall <mode> <language> <lat1> <long1> <lat2> <long2> [flags]

Modes:
  0  isolate distance entry point (host-native)
  1  isolate guest entry point, no cache
  2  isolate guest entry point, thread-unsafe parse cache
  3  isolate guest entry point, thread-safe parse cache
  4  VM call of bench/NativeLibrary.distance
  5  VM guest context eval and execute
  6  isolate distance_ruby entry point (Ruby evaluated once per isolate)
  7  VM call of bench/NativeLibraryRuby.distance (Ruby evaluated once per VM)

Languages:
  js, ruby

Flags:
  --reuse-context      Keep runtimes alive between cases
  --iterations <n>     Timed invocations after warm-up (default: 1)
  --verbose            Print sample count and mean time to stderr
  --config <file>      Load driver settings from a JSON file
  --contention <n>     Resolve the fragment from <n> threads at once (modes 1-3)
  -h, --help           Show this help"
    );
}
