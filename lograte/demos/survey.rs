//! Survey example: measure log ingestion rates across several appliances
//!
//! Samples every host concurrently, prints per-host statistics with a
//! storage estimate and optionally writes them to a CSV file.
//!
//! # Usage
//!
//! Sample a fixed list of hosts:
//! ```bash
//! cargo run --example survey -- --hosts 10.0.0.1,10.0.0.2 --user admin --password secret
//! ```
//!
//! Sample every device connected to a log-collector manager, plus the
//! manager itself:
//! ```bash
//! cargo run --example survey -- --manager 10.0.0.10 --user admin --password secret --csv rates.csv
//! ```

use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexSet;
use lograte::hosts::parse_host_list;
use lograte::survey::{SurveyConfig, collect_all, discover_devices};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let Some(password) = &args.password else {
        eprintln!("Error: --password is required");
        std::process::exit(1);
    };

    let template = args
        .config
        .builder("localhost")
        .username(&args.user)
        .password(password)
        .build()?;

    let mut hosts = parse_host_list(&args.hosts)?;

    if let Some(manager) = &args.manager {
        println!("Listing devices connected to {}...", manager);
        let managers = vec![manager.clone()];
        let discovery = discover_devices(&template, &managers).await;

        if !discovery.unsupported.is_empty() {
            eprintln!("{} does not look like a log-collector manager", manager);
        }
        for (host, e) in &discovery.failed {
            eprintln!("{}: {}", host, e);
        }
        println!("Found {} devices", discovery.devices.len());

        let mut all: IndexSet<String> = hosts.into_iter().collect();
        all.insert(manager.clone());
        all.extend(discovery.devices);
        hosts = all.into_iter().collect();
    }

    if hosts.is_empty() {
        eprintln!("Error: provide --hosts or --manager");
        std::process::exit(1);
    }

    println!(
        "Sampling {} hosts, {} samples each, every {}s...",
        hosts.len(),
        args.config.samples,
        args.config.sample_interval_secs
    );

    let outcomes = collect_all(&template, &hosts, args.config.samples, |p| {
        println!("[{}/{}] {}: {} logs/s", p.completed, p.total, p.host, p.rate);
    })
    .await;

    for (host, outcome) in &outcomes {
        if let Err(e) = outcome {
            eprintln!("{} failed ({}): {}", host, e.reason(), e);
        }
    }

    let report = args.config.report(&outcomes);
    println!("\n{}", report);

    if let Some(path) = &args.csv {
        report.write_csv(File::create(path)?)?;
        println!("Results saved to {}", path.display());
    }

    Ok(())
}

/// Parse a numeric flag value, exiting with a message if it is not a number.
fn number<T: FromStr>(flag: &str, value: &str) -> T {
    parse_number(flag, value).unwrap_or_else(|msg| {
        eprintln!("Error: {}", msg);
        std::process::exit(1);
    })
}

fn parse_number<T: FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    hosts: String,
    manager: Option<String>,
    user: String,
    password: Option<String>,
    csv: Option<PathBuf>,
    config: SurveyConfig,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut hosts = String::new();
        let mut manager = None;
        let mut user = "admin".to_string();
        let mut password = None;
        let mut csv = None;
        let mut config = SurveyConfig::default();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--hosts" | "-h", Some(v)) => hosts = v,
                ("--manager" | "-m", Some(v)) => manager = Some(v),
                ("--user" | "-u", Some(v)) => user = v,
                ("--password" | "-P", Some(v)) => password = Some(v),
                ("--samples" | "-n", Some(v)) => config.samples = number(&args[i], &v),
                ("--timeout" | "-t", Some(v)) => config.connect_timeout_secs = number(&args[i], &v),
                ("--interval" | "-i", Some(v)) => config.sample_interval_secs = number(&args[i], &v),
                ("--days" | "-d", Some(v)) => config.retention_days = number(&args[i], &v),
                ("--size" | "-s", Some(v)) => config.log_size_bytes = number(&args[i], &v),
                ("--csv", Some(v)) => csv = Some(PathBuf::from(v)),
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                (other, _) => {
                    eprintln!("Unknown or incomplete argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        Self {
            hosts,
            manager,
            user,
            password,
            csv,
            config,
        }
    }

    fn print_help() {
        println!(
            r#"lograte survey example

USAGE:
    cargo run --example survey -- [OPTIONS]

OPTIONS:
    -h, --hosts <LIST>       Comma-separated IPv4 addresses to sample
    -m, --manager <HOST>     Log-collector manager whose devices to sample
    -u, --user <USER>        Username [default: admin]
    -P, --password <PASS>    Password for authentication
    -n, --samples <N>        Samples per host [default: 5]
    -t, --timeout <SECS>     Connection timeout [default: 10]
    -i, --interval <SECS>    Seconds between samples [default: 10]
    -d, --days <DAYS>        Log retention for the storage estimate [default: 30]
    -s, --size <BYTES>       Average log size [default: 500]
    --csv <PATH>             Write results to a CSV file
    --help                   Print this help message
"#
        );
    }
}
