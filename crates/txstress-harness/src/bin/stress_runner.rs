//! Command-line entry point for the stress harness.
//!
//! Builds a workload from a named profile plus flag overrides, runs it
//! against a SQLite store, prints the run report, and exits non-zero on a
//! verification failure.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use txstress_harness::profiles::{PROFILE_NAMES, profile_by_name, profile_smoke};
use txstress_harness::{InsertCountRange, WorkloadConfig, run_stress};
use txstress_store::SqliteStore;

#[derive(Debug)]
struct CliConfig {
    workload: WorkloadConfig,
    db_path: PathBuf,
    json_output: Option<PathBuf>,
}

fn print_help() {
    let profiles = PROFILE_NAMES.join("|");
    let help = format!(
        "\
stress-runner — transactional stress harness over a SQLite store

USAGE:
    cargo run -p txstress-harness --bin stress-runner -- [OPTIONS]

OPTIONS:
    --profile <NAME>              Base workload profile: {profiles}
                                  (default: smoke)
    --transactions <u64>          Total transactions across all workers
    --concurrency <u16>           Number of concurrent workers
    --inserts-min <u32>           Minimum inserts per transaction
    --inserts-max <u32>           Maximum inserts per transaction
    --rollback-probability <f64>  Probability a transaction rolls back
    --duplicate-probability <f64> Probability of a duplicate-retry batch
    --duplicate-batch <u32>       Rows in the duplicate-retry batch
    --fixed-key <LABEL>           Force every row onto one identity label
    --seed <u64>                  Run seed (decimal or 0x-prefixed hex)
    --db <PATH>                   Database file (default: txstress.db,
                                  recreated at start)
    --json <PATH>                 Also write the report as JSON
    -h, --help                    Show this help
"
    );
    println!("{help}");
}

fn parse_u64(value: &str) -> Option<u64> {
    value.strip_prefix("0x").map_or_else(
        || value.parse::<u64>().ok(),
        |hex| u64::from_str_radix(hex, 16).ok(),
    )
}

fn parse_args(args: &[String]) -> Result<CliConfig, String> {
    let mut workload: Option<WorkloadConfig> = None;
    let mut overrides: Vec<(String, String)> = Vec::new();
    let mut db_path = PathBuf::from("txstress.db");
    let mut json_output: Option<PathBuf> = None;

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--db" | "--json" | "--profile" | "--transactions" | "--concurrency"
            | "--inserts-min" | "--inserts-max" | "--rollback-probability"
            | "--duplicate-probability" | "--duplicate-batch" | "--fixed-key" | "--seed" => {
                index += 1;
                if index >= args.len() {
                    return Err(format!("{flag} requires a value"));
                }
                let value = args[index].clone();
                match flag {
                    "--db" => db_path = PathBuf::from(&value),
                    "--json" => json_output = Some(PathBuf::from(&value)),
                    "--profile" => {
                        workload = Some(
                            profile_by_name(&value)
                                .ok_or_else(|| format!("unknown profile: {value}"))?,
                        );
                    }
                    _ => overrides.push((flag.to_owned(), value)),
                }
            }
            other => return Err(format!("unknown option: {other}")),
        }
        index += 1;
    }

    let mut workload = workload.unwrap_or_else(profile_smoke);
    for (flag, value) in overrides {
        apply_override(&mut workload, &flag, &value)?;
    }

    Ok(CliConfig {
        workload,
        db_path,
        json_output,
    })
}

fn apply_override(workload: &mut WorkloadConfig, flag: &str, value: &str) -> Result<(), String> {
    let bad = || format!("invalid {flag} value: {value}");
    match flag {
        "--transactions" => workload.total_transactions = value.parse().map_err(|_| bad())?,
        "--concurrency" => workload.concurrency = value.parse().map_err(|_| bad())?,
        "--inserts-min" => {
            workload.insert_count_range =
                InsertCountRange::new(value.parse().map_err(|_| bad())?, workload.insert_count_range.max);
        }
        "--inserts-max" => {
            workload.insert_count_range =
                InsertCountRange::new(workload.insert_count_range.min, value.parse().map_err(|_| bad())?);
        }
        "--rollback-probability" => {
            workload.rollback_probability = value.parse().map_err(|_| bad())?;
        }
        "--duplicate-probability" => {
            workload.duplicate_retry_probability = value.parse().map_err(|_| bad())?;
        }
        "--duplicate-batch" => workload.duplicate_batch_size = value.parse().map_err(|_| bad())?,
        "--fixed-key" => workload.fixed_key = Some(value.to_owned()),
        "--seed" => workload.run_seed = parse_u64(value).ok_or_else(bad)?,
        _ => return Err(format!("unknown option: {flag}")),
    }
    Ok(())
}

fn run(cli: &CliConfig) -> Result<bool, String> {
    cli.workload
        .validate()
        .map_err(|err| err.to_string())?;

    let store = SqliteStore::create(&cli.db_path).map_err(|err| err.to_string())?;
    let report = run_stress(&cli.workload, &store).map_err(|err| err.to_string())?;

    print!("{}", report.render_text());
    println!("{}", report.triage_line());

    if let Some(path) = &cli.json_output {
        let json = report.to_json().map_err(|err| err.to_string())?;
        std::fs::write(path, json).map_err(|err| err.to_string())?;
    }

    Ok(report.passed())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("error: {message}");
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
